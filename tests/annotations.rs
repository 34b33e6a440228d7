use duck_types::ast::{Node, Shape};
use duck_types::{Error, Key, Registry, Types, Unexpected, Validator, compile_annotation, parse};
use serde_json::{Value, json};

const NAMES: &[&str] = &[
    "null", "undefined", "number", "numeric", "string", "int", "float", "bool", "boolean", "true",
    "false", "array", "object", "*", "someType", r"Duck\Types\Tests\Unit", r"\Duck\Types\Tests\Unit",
];

fn leaf(name: &str) -> Node {
    Node::leaf(name)
}

fn compiled(annotation: &str) -> Validator {
    compile_annotation(annotation, &Registry::new()).unwrap()
}

fn messages(annotation: &str, value: Value) -> Vec<String> {
    compiled(annotation).check(&value).unwrap_err().messages().into_vec()
}

// ————————————————————————————————————————————————————————————————————————————
// PARSER
// ————————————————————————————————————————————————————————————————————————————

#[test]
fn names_parse_to_leaves() {
    for name in NAMES {
        assert_eq!(parse(name).unwrap(), leaf(name), "{name}");
    }
}

#[test]
fn nullable_names() {
    for name in NAMES {
        assert_eq!(
            parse(&format!("?{name}")).unwrap(),
            Node::Union(vec![leaf("null"), leaf(name)]),
            "?{name}"
        );
    }
}

#[test]
fn array_names_in_both_syntaxes() {
    for name in NAMES.iter().filter(|n| **n != "*") {
        let expected = Node::Array(Box::new(leaf(name)));
        assert_eq!(parse(&format!("{name}[]")).unwrap(), expected, "{name}[]");
        assert_eq!(parse(&format!("Array<{name}>")).unwrap(), expected, "Array<{name}>");
    }
    assert_eq!(parse("Array<*>").unwrap(), Node::Array(Box::new(leaf("*"))));
    assert_eq!(parse("*[]").unwrap(), Node::Union(vec![leaf("*"), leaf("array")]));
}

#[test]
fn union_chains() {
    for pair in NAMES.windows(3) {
        let annotation = pair.join("|");
        let expected = Node::Union(pair.iter().map(|n| leaf(n)).collect());
        assert_eq!(parse(&annotation).unwrap(), expected, "{annotation}");
    }
    assert_eq!(
        parse("null|null|null").unwrap(),
        Node::Union(vec![leaf("null"), leaf("null"), leaf("null")])
    );
}

#[test]
fn multi_line_annotation_with_comments() {
    let annotation = "
        // a user record
        {|
            id: int,            // primary key
            name: string,
            tags?: string[],
        |}
    ";
    let Node::Shape(Shape { exact, properties, indexer }) = parse(annotation).unwrap() else {
        panic!("expected a shape");
    };
    assert!(exact);
    assert!(indexer.is_none());
    assert_eq!(properties.keys().collect::<Vec<_>>(), vec!["id", "name", "tags"]);
    assert!(properties["tags"].optional);
}

#[test]
fn leading_operators_are_tolerated() {
    assert_eq!(parse("| int | string").unwrap(), parse("int|string").unwrap());
    assert_eq!(parse("{a: | int | string}").unwrap(), parse("{a: int|string}").unwrap());
    assert!(matches!(parse("int || string"), Err(Error::Syntax(_))));
}

#[test]
fn authoring_errors() {
    assert!(matches!(parse("int$"), Err(Error::Syntax(_))));
    assert!(matches!(parse("(int"), Err(Error::Syntax(_))));
    assert!(matches!(parse("()"), Err(Error::Syntax(_))));
    assert!(matches!(parse(""), Err(Error::Conflict(_))));
    assert!(matches!(parse("{[string]: int, [int]: int}"), Err(Error::Conflict(_))));
    assert!(matches!(parse("{[key: string]: int}"), Err(Error::NotImplemented(_))));
    assert!(matches!(
        compile_annotation("Unknown", &Registry::new()),
        Err(Error::NotFound(name)) if name == "Unknown"
    ));
}

// ————————————————————————————————————————————————————————————————————————————
// PRIMITIVES
// ————————————————————————————————————————————————————————————————————————————

#[test]
fn primitive_values() {
    let types = Types::new();
    let cases: &[(&str, Value, Value)] = &[
        ("null", json!(null), json!(0)),
        ("number", json!(100), json!("100")),
        ("numeric", json!("100"), json!("one hundred")),
        ("string", json!("hello"), json!(false)),
        ("int", json!(42), json!(4.2)),
        ("float", json!(33.33), json!(33)),
        ("bool", json!(true), json!(null)),
        ("boolean", json!(false), json!("false")),
        ("true", json!(true), json!(false)),
        ("false", json!(false), json!(true)),
        ("array", json!([1]), json!({})),
        ("object", json!({}), json!([])),
        ("*", json!(0), json!(null)),
    ];
    for (annotation, good, bad) in cases {
        assert!(types.is(annotation, Some(good)).unwrap(), "{annotation} accepts {good}");
        assert!(!types.is(annotation, Some(bad)).unwrap(), "{annotation} rejects {bad}");
        let nullable = format!("?{annotation}");
        assert!(types.is(&nullable, Some(&json!(null))).unwrap(), "{nullable} accepts null");
    }
    assert!(types.is("undefined", None).unwrap());
    assert!(!types.is("*", None).unwrap());
}

// ————————————————————————————————————————————————————————————————————————————
// COMBINED ANNOTATIONS
// ————————————————————————————————————————————————————————————————————————————

#[test]
fn string_list() {
    let list = compiled("string[]");
    assert!(list.check(&json!(["foo", "bar", "baz"])).is_ok());

    let err = list.check(&json!(["foo", "bar", 123])).unwrap_err();
    assert_eq!(err.unexpected(), &Unexpected::InArrayMembers);
    assert_eq!(err.children().len(), 1);
    assert_eq!(
        err.child(&Key::Index(2)).unwrap().unexpected(),
        &Unexpected::Other("incompatible with string".into())
    );
}

#[test]
fn union_list() {
    let list = compiled("(string|int)[]");
    assert!(list.check(&json!(["foo", "bar", 123])).is_ok());
    assert_eq!(
        messages("(string|int)[]", json!(["foo", null, 123])),
        vec![
            "null is incompatible with union because null is either incompatible with string \
             or incompatible with int at index #1 in array members"
        ]
    );
}

#[test]
fn nullable_string_lists() {
    for annotation in ["Array<?string>", "(?string)[]"] {
        let list = compiled(annotation);
        assert!(list.check(&json!(["foo", null, "bar"])).is_ok(), "{annotation}");
        assert!(list.check(&json!(["foo", null, 123])).is_err(), "{annotation}");
    }
}

#[test]
fn exact_shape() {
    let shape = compiled("{|foo: string, bar: int|}");
    assert!(shape.check(&json!({"foo": "baz", "bar": 10})).is_ok());

    let err = shape.check(&json!({"foo": "baz", "bar": 10, "buz": "bat"})).unwrap_err();
    assert_eq!(err.unexpected(), &Unexpected::InExactShapeProperties);
    assert_eq!(err.children().len(), 1);
    assert_eq!(
        err.child(&Key::Property("buz".into())).unwrap().to_string(),
        "property `buz` is missing in exact shape but exists in value"
    );
}

#[test]
fn exact_shape_with_nullable_values() {
    let shape = compiled("{|foo: ?int, baz: ?int |}");
    assert!(shape.check(&json!({"foo": 124, "baz": null})).is_ok());
    assert!(shape.check(&json!({"foo": 124, "baz": 13})).is_ok());
    assert!(shape.check(&json!({"foo": 124, "baz": "13"})).is_err());
    assert!(shape.check(&json!({"foo": 124})).is_err());
}

#[test]
fn exact_shape_missing_and_extra_keys() {
    let shape = compiled("{| a: int, b: string, c?: bool |}");
    assert!(shape.check(&json!({"a": 1, "b": "x"})).is_ok());
    assert!(shape.check(&json!({"a": 1, "b": "x", "c": true})).is_ok());
    assert!(shape.check(&json!({"a": 1})).is_err());
    assert!(shape.check(&json!({"a": 1, "b": "x", "d": 0})).is_err());
}

#[test]
fn inexact_shape_allows_extra_keys() {
    let shape = compiled("{ a: int }");
    assert!(shape.check(&json!({"a": 1, "b": "anything"})).is_ok());
    assert!(compiled("{}").check(&json!({"x": 1})).is_ok());
    assert!(compiled("{||}").check(&json!({"x": 1})).is_err());
}

#[test]
fn nested_lists() {
    let nested = compiled("(int[])[]");
    assert!(nested.check(&json!([[1, 2, 3], [1, 2]])).is_ok());
    assert!(nested.check(&json!([[1, 2, 3], [1, 2], []])).is_ok());
    assert!(nested.check(&json!([[1, 2, 3], [[1, 1]]])).is_err());
    assert_eq!(
        messages("(int[])[]", json!([[1, "x"]])),
        vec!["string literal \"x\" is incompatible with int at index #1 in array members of property `[0]`"]
    );
}

#[test]
fn nested_exact_shapes() {
    let nested = compiled("{|foo: {|bar: string, baz:int|} |}");
    assert!(nested.check(&json!({"foo": {"bar": "hello", "baz": 123}})).is_ok());
    assert_eq!(
        messages("{|foo: {|bar: string, baz:int|} |}", json!({"foo": {"bar": "hello", "baz": "123"}})),
        vec!["string literal \"123\" is incompatible with int in object literal of property `foo.baz`"]
    );
    assert!(nested.check(&json!({"foo": {"bar": "hello", "baz": 123, "buz": null}})).is_err());
}

#[test]
fn intersection_of_shapes() {
    let both = compiled("{a: int} & {b: float}");
    assert!(both.check(&json!({"a": 1, "b": 1.5})).is_ok());
    let err = both.check(&json!({"a": 1})).unwrap_err();
    assert_eq!(err.unexpected(), &Unexpected::WithIntersection);
    assert_eq!(err.children().keys().collect::<Vec<_>>(), vec![&Key::Index(1)]);
    assert_eq!(
        err.messages().into_vec(),
        vec!["undefined is incompatible with float in object literal of property `b`"]
    );
}

#[test]
fn tuples() {
    let pair = compiled("[int, string]");
    assert!(pair.check(&json!([1, "a"])).is_ok());
    for value in [json!([1]), json!([1, "a", 2])] {
        let message = pair.check(&value).unwrap_err().to_string();
        assert!(message.contains("tuple type with arity of 2"), "{message}");
    }
    assert_eq!(
        messages("{t: [int, string]}", json!({"t": [1, 2]})),
        vec!["int literal 2 is incompatible with string at index #1 in tuple members of property `t`"]
    );
}

#[test]
fn literals_and_indexers() {
    let types = Types::new();
    assert!(types.is("'GET' | 'POST'", Some(&json!("GET"))).unwrap());
    assert!(!types.is("'GET' | 'POST'", Some(&json!("PUT"))).unwrap());
    assert!(types.is("{ [string]: int[] }", Some(&json!({"a": [1], "b": []}))).unwrap());
    assert!(!types.is("{ [string]: int[] }", Some(&json!({"a": ["1"]}))).unwrap());
    assert!(types.is("{| kind: 'x', ['a' | 'b']: int |}", Some(&json!({"kind": "x", "a": 1}))).unwrap());
    assert!(!types.is("{| kind: 'x', ['a' | 'b']: int |}", Some(&json!({"kind": "x", "c": 1}))).unwrap());
}

#[test]
fn literals_with_bracket_and_colon_characters() {
    let types = Types::new();
    for (annotation, value) in [
        ("'http://x'", "http://x"),
        ("'a{b}'", "a{b}"),
        ("'x>y'", "x>y"),
        ("'t[]'", "t[]"),
        ("'a | b'", "a | b"),
    ] {
        assert_eq!(parse(annotation).unwrap(), leaf(annotation), "{annotation}");
        assert!(types.is(annotation, Some(&json!(value))).unwrap(), "{annotation}");
    }
    assert!(types.is("{ url: 'http://x' }", Some(&json!({"url": "http://x"}))).unwrap());
    assert!(types.is("('[]' | 'Array<int>')[]", Some(&json!(["[]", "Array<int>"]))).unwrap());
}

#[test]
fn flattening_is_repeatable() {
    let err = compiled("{a: (int|string)[], b: {c: [bool]}}")
        .check(&json!({"a": [null], "b": {"c": [1]}}))
        .unwrap_err();
    assert_eq!(err.messages(), err.messages());
    assert_eq!(err.messages().into_vec().len(), 2);
}
