use crate::rules::exprs::*;
use crate::rules::grammar::{Dialect, Grammar};
use crate::rules::parser::{parse, parse_expr, parse_expr_with};
use indoc::indoc;
use pretty_assertions::assert_eq;
use rstest::rstest;

fn canonical(source: &str) -> String {
    parse_expr(source).unwrap().to_string()
}

#[rstest]
#[case("a+b*c", "a + b * c")]
#[case("(a + b) * c", "(a + b) * c")]
#[case("((a))", "a")]
#[case("a - b - c", "a - b - c")]
#[case("a - (b - c)", "a - (b - c)")]
#[case("(a * b) * c", "a * b * c")]
#[case("!(a == b)", "!(a == b)")]
#[case("!a == b", "!a == b")]
#[case("--a", "--a")]
#[case("-(a.b)", "-a.b")]
#[case("(-a).b", "(-a).b")]
#[case("(a || b).size()", "(a || b).size()")]
#[case("(a && b) || c", "a && b || c")]
#[case("a && (b || c)", "a && (b || c)")]
#[case("(a is int) == true", "(a is int) == true")]
#[case("a == b is bool", "a == b is bool")]
#[case("(a ? b : c) ? d : e", "(a ? b : c) ? d : e")]
#[case("a ? b : (c ? d : e)", "a ? b : c ? d : e")]
#[case("(a ? b : c) + 1", "(a ? b : c) + 1")]
#[case("'it\\'s'", "\"it's\"")]
#[case("\"a\\\\b\"", "\"a\\\\b\"")]
#[case("1.0", "1.0")]
#[case("0.250", "0.25")]
#[case("[1,2 ,3]", "[1, 2, 3]")]
#[case("{'a' :1,b:c}", "{\"a\": 1, b: c}")]
#[case("data['name']", "data[\"name\"]")]
#[case("data[(\"name\")]", "data[(\"name\")]")]
#[case("list[1:x]", "list[1:x]")]
#[case("get(/databases/$(database)/documents/users/$(uid)).data", "get(/databases/$(database)/documents/users/$(uid)).data")]
#[case("/a/b / 2", "/a/b / 2")]
fn test_canonical_expressions(#[case] source: &str, #[case] expected: &str) {
    assert_eq!(canonical(source), expected);
}

#[rstest]
#[case("a - (b - c) * -(d % e)")]
#[case("!(a in b) && (c || d is list)")]
#[case("x ? (y ? 1 : 2) : z ? 3 : 4")]
#[case("(a ? b : c).d[e ? f : g]")]
#[case("x[(\"a\")]")]
#[case("x['a'][('b')]['c' + d]")]
#[case("request.resource.data.keys().hasOnly(['a', 'b']) == !(c < d)")]
#[case("exists(/databases/db/documents/$(request.auth.uid)) && {'k': [1.5, null]}.k[0] != -1")]
fn test_expression_round_trip(#[case] source: &str) {
    let parsed = parse_expr(source).unwrap();
    let printed = parsed.to_string();
    let reparsed = parse_expr(&printed).unwrap();
    assert_eq!(without_spans(&parsed), without_spans(&reparsed));
    assert_eq!(reparsed.to_string(), printed);
}

#[test]
fn test_string_element_keeps_its_kind() {
    let legacy = Grammar::new(Dialect::Legacy);
    let parsed = parse_expr_with("data['name']", &legacy).unwrap();
    let printed = parsed.to_string();
    assert_eq!(printed, "data[(\"name\")]");
    for grammar in [legacy, Grammar::default()] {
        let reparsed = parse_expr_with(&printed, &grammar).unwrap();
        assert_eq!(without_spans(&parsed), without_spans(&reparsed));
    }
}

#[test]
fn test_canonical_file() {
    let source = indoc! {r#"
        rules_version='2';
        service cloud.firestore{match /databases/{database}/documents{
        function f(a,b){let c=a+b;return c*2;}
        allow read,write:if f(1,2)>3;
        match /logs/{entry=**}{allow list;}
        allow create;}}
    "#};
    let expected = indoc! {r#"
        rules_version = "2";
        service cloud.firestore {
          match /databases/{database}/documents {
            function f(a, b) {
              let c = a + b;
              return c * 2;
            }
            allow read, write: if f(1, 2) > 3;
            match /logs/{entry=**} {
              allow list;
            }
            allow create;
          }
        }
    "#};
    let rules = parse(source).unwrap();
    assert_eq!(rules.to_string(), expected);
}

#[test]
fn test_empty_service() {
    let rules = parse("service cloud.firestore { }").unwrap();
    assert_eq!(rules.to_string(), "service cloud.firestore {\n}\n");
}

#[test]
fn test_file_round_trip() {
    let source = indoc! {r#"
        rules_version = '2';
        service cloud.firestore {
          match /databases/{database}/documents {
            function isOwner(userId) {
              let uid = request.auth.uid;
              return request.auth != null && uid == userId;
            }
            match /users/{userId}/posts/{post} {
              allow get, list: if resource.data.visible == true || isOwner(userId);
              allow update: if request.resource.data.diff(resource.data).affectedKeys()
                .hasOnly(['title']) && request.time < resource.data.lockedAt + duration.value(1, 'h');
              allow delete: if get(/databases/$(database)/documents/admins/$(request.auth.uid)).data.role in ['owner'];
            }
          }
        }
    "#};
    let rules = parse(source).unwrap();
    let printed = rules.to_string();
    let reparsed = parse(&printed).unwrap();
    assert!(rules.same_structure(&reparsed));
    assert_eq!(reparsed.to_string(), printed);
}

#[test]
fn test_display_of_fragments() {
    let rule = parse("service cloud.firestore { allow read, write; }")
        .unwrap()
        .body
        .rules()
        .next()
        .cloned()
        .unwrap();
    assert_eq!(rule.to_string(), "allow read, write;");
    assert_eq!(BinaryOp::Ne.to_string(), "!=");
    assert_eq!(TypeName::LatLng.to_string(), "latlng");
}
