//! Unit tests for frontmatter parsing

use conformance_harness::{Flag, HarnessError, Phase, TestCase, TestMetadata};
use std::collections::{BTreeSet, HashSet};

#[test]
fn test_parse_basic_metadata() {
    let source = r#"/*---
description: Test for addition operator
info: |
  The addition operator either performs string concatenation
  or numeric addition.
---*/
1 + 1;
"#;

    let metadata = TestMetadata::parse(source).unwrap();
    assert_eq!(metadata.description, "Test for addition operator");
    assert!(metadata.info.is_some());
    assert!(metadata.info.unwrap().contains("string concatenation"));
}

#[test]
fn test_parse_negative_expectation_parse_phase() {
    let source = r#"/*---
description: Early error for reserved word
negative:
  phase: parse
  type: SyntaxError
---*/
$DONOTEVALUATE();
var class = 1;
"#;

    let metadata = TestMetadata::parse(source).unwrap();
    let neg = metadata.negative.as_ref().unwrap();
    assert_eq!(neg.phase, Phase::Parse);
    assert_eq!(neg.error_type, "SyntaxError");
    assert!(metadata.expects_early_error());
}

#[test]
fn test_parse_negative_expectation_runtime_phase() {
    let source = r#"/*---
description: Runtime error for undefined variable
negative:
  phase: runtime
  type: ReferenceError
---*/
undefinedVar;
"#;

    let metadata = TestMetadata::parse(source).unwrap();
    assert_eq!(metadata.negative_phase(), Some(Phase::Runtime));
    assert!(!metadata.expects_early_error());
}

#[test]
fn test_parse_negative_expectation_resolution_phase() {
    let source = r#"/*---
description: Module resolution error
negative:
  phase: resolution
  type: SyntaxError
flags: [module]
---*/
import { x } from './nonexistent.js';
"#;

    let metadata = TestMetadata::parse(source).unwrap();
    assert_eq!(metadata.negative_phase(), Some(Phase::Resolution));
    assert!(metadata.expects_early_error());
}

#[test]
fn test_legacy_early_phase_is_parse() {
    let source = "/*---\nnegative:\n  phase: early\n  type: SyntaxError\n---*/\n";
    let metadata = TestMetadata::parse(source).unwrap();
    assert_eq!(metadata.negative_phase(), Some(Phase::Parse));
}

#[test]
fn test_unknown_phase_is_malformed() {
    let source = "/*---\nnegative:\n  phase: sometime\n  type: SyntaxError\n---*/\n";
    assert!(matches!(
        TestMetadata::parse(source),
        Err(HarnessError::MalformedMetadata(_))
    ));
}

#[test]
fn test_negative_without_type_is_malformed() {
    let source = "/*---\nnegative:\n  phase: parse\n---*/\n";
    assert!(TestMetadata::parse(source).is_err());
}

#[test]
fn test_parse_includes_keeps_order() {
    let source = r#"/*---
description: Test with helper includes
includes: [propertyHelper.js, compareArray.js]
---*/
test();
"#;

    let metadata = TestMetadata::parse(source).unwrap();
    assert_eq!(metadata.includes, vec!["propertyHelper.js", "compareArray.js"]);
}

#[test]
fn test_parse_block_list_includes() {
    let source = r#"/*---
includes:
  - compareArray.js
  - asyncHelpers.js
---*/
"#;

    let metadata = TestMetadata::parse(source).unwrap();
    assert_eq!(metadata.includes, vec!["compareArray.js", "asyncHelpers.js"]);
}

#[test]
fn test_parse_flags() {
    let source = r#"/*---
description: Strict mode only async test
flags: [onlyStrict, async]
---*/
"use strict";
$DONE();
"#;

    let metadata = TestMetadata::parse(source).unwrap();
    assert!(metadata.has_flag(&Flag::OnlyStrict));
    assert!(metadata.has_flag(&Flag::Async));
    assert!(metadata.is_strict_only());
    assert!(metadata.is_async());
    assert!(!metadata.is_no_strict());
    assert!(!metadata.is_module());
}

#[test]
fn test_parse_no_strict_flag() {
    let source = r#"/*---
description: Non-strict mode only test
flags: [noStrict]
---*/
test();
"#;

    let metadata = TestMetadata::parse(source).unwrap();
    assert!(metadata.is_no_strict());
    assert!(!metadata.is_strict_only());
}

#[test]
fn test_parse_module_and_raw_flags() {
    let module = TestMetadata::parse("/*---\nflags: [module]\n---*/\nexport default 42;\n").unwrap();
    assert!(module.is_module());

    let raw = TestMetadata::parse("/*---\nflags: [raw]\n---*/\n").unwrap();
    assert!(raw.is_raw());
}

#[test]
fn test_unknown_flags_are_kept() {
    let source = "/*---\nflags: [generated, CanBlockIsFalse, someFutureFlag]\n---*/\n";
    let metadata = TestMetadata::parse(source).unwrap();
    assert!(metadata.has_flag(&Flag::Generated));
    assert!(metadata.has_flag(&Flag::CanBlockIsFalse));
    assert!(metadata.has_flag(&Flag::Other("someFutureFlag".into())));
}

#[test]
fn test_contradictory_flags_are_malformed() {
    for flags in ["[onlyStrict, noStrict]", "[raw, onlyStrict]"] {
        let source = format!("/*---\nflags: {}\n---*/\n", flags);
        assert!(
            matches!(TestMetadata::parse(&source), Err(HarnessError::MalformedMetadata(_))),
            "{} should be rejected",
            flags
        );
    }
}

#[test]
fn test_negative_async_is_malformed() {
    let source = r#"/*---
flags: [async]
negative:
  phase: runtime
  type: TypeError
---*/
"#;
    let err = TestMetadata::parse(source).unwrap_err();
    assert!(err.to_string().contains("cannot also be `async`"));
}

#[test]
fn test_parse_features() {
    let source = r#"/*---
description: BigInt and Symbol test
features: [BigInt, Symbol.iterator, optional-chaining]
---*/
let x = 42n;
"#;

    let metadata = TestMetadata::parse(source).unwrap();
    assert_eq!(metadata.features.len(), 3);
    assert!(metadata.features.contains("BigInt"));
    assert!(metadata.features.contains("Symbol.iterator"));
    assert!(metadata.features.contains("optional-chaining"));
}

#[test]
fn test_parse_es_identifiers() {
    let source = r#"/*---
description: Test with ES identifiers
es5id: 12.3.4
es6id: 23.4.5.6
esid: sec-addition-operator-plus
---*/
1 + 1;
"#;

    let metadata = TestMetadata::parse(source).unwrap();
    assert_eq!(metadata.es5id, Some("12.3.4".to_string()));
    assert_eq!(metadata.es6id, Some("23.4.5.6".to_string()));
    assert_eq!(metadata.esid, Some("sec-addition-operator-plus".to_string()));
}

#[test]
fn test_unrecognized_keys_preserved() {
    let source = r#"/*---
description: carries extra keys
defines: [verifyProperty]
copyright: the authors
---*/
"#;

    let metadata = TestMetadata::parse(source).unwrap();
    assert!(metadata.extra.contains_key("defines"));
    assert_eq!(
        metadata.extra.get("copyright").and_then(|v| v.as_str()),
        Some("the authors")
    );
}

#[test]
fn test_unsupported_features_list() {
    let source = r#"/*---
features: [BigInt, Temporal, Symbol, ShadowRealm]
---*/
"#;

    let metadata = TestMetadata::parse(source).unwrap();
    let unsupported: HashSet<String> = ["Temporal", "ShadowRealm", "Atomics"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let missing = metadata.unsupported_features(&unsupported);
    assert_eq!(missing, vec!["ShadowRealm".to_string(), "Temporal".to_string()]);
}

#[test]
fn test_flags_and_features_survive_round_trip() {
    let source = r#"/*---
description: round trip
flags: [noStrict, async, generated, someFutureFlag]
features: [destructuring-binding, async-iteration, Symbol.asyncIterator]
includes: [compareArray.js]
---*/
"#;

    let original = TestMetadata::parse(source).unwrap();
    let yaml = original.to_yaml().unwrap();
    let reparsed = TestMetadata::parse(&format!("/*---\n{}---*/\n", yaml)).unwrap();

    let flag_names = |m: &TestMetadata| m.flags.iter().map(|f| f.to_string()).collect::<BTreeSet<_>>();
    assert_eq!(flag_names(&original), flag_names(&reparsed));
    assert_eq!(original.features, reparsed.features);
    assert_eq!(original, reparsed);
}

#[test]
fn test_parse_missing_frontmatter_error() {
    let source = r#"
// No frontmatter here
1 + 1;
"#;

    let err = TestMetadata::parse(source).unwrap_err();
    assert!(matches!(err, HarnessError::MalformedMetadata(_)));
    assert!(err.to_string().contains("no `/*--- ... ---*/` frontmatter block"));
}

#[test]
fn test_parse_unterminated_frontmatter_error() {
    let source = "/*---\ndescription: never closed\n*/\n1;\n";
    let err = TestMetadata::parse(source).unwrap_err();
    assert!(err.to_string().contains("not terminated"));
}

#[test]
fn test_parse_duplicate_frontmatter_error() {
    let source = "/*---\ndescription: a\n---*/\n/*---\ndescription: b\n---*/\n";
    let err = TestMetadata::parse(source).unwrap_err();
    assert!(err.to_string().contains("more than one"));
}

#[test]
fn test_parse_invalid_yaml_error() {
    let source = r#"/*---
description: [invalid yaml
  not closed
---*/
"#;

    assert!(matches!(
        TestMetadata::parse(source),
        Err(HarnessError::MalformedMetadata(_))
    ));
}

#[test]
fn test_flags_must_be_a_list() {
    let source = "/*---\nflags:\n  strict: yes\n---*/\n";
    assert!(TestMetadata::parse(source).is_err());
}

#[test]
fn test_empty_frontmatter_is_default() {
    let metadata = TestMetadata::parse("/*---\n---*/\n1;\n").unwrap();
    assert_eq!(metadata, TestMetadata::default());
}

#[test]
fn test_case_body_strips_frontmatter() {
    let case = TestCase::from_source(
        "code.js",
        "// Copyright\n/*---\ndescription: Test for code extraction\n---*/\nvar x = 42;\nprint(x);\n",
    )
    .unwrap();

    assert_eq!(case.name(), "code");
    assert_eq!(case.body(), "var x = 42;\nprint(x);\n");
    assert!(case.source.contains("/*---"));
}
