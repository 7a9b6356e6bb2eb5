// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod utils;

#[cfg(test)]
mod parse_tree_tests {
    use firestore_rules::commands::{DIALECT, PARSE_TREE, PRINT_JSON, PRINT_YAML, RULES};
    use firestore_rules::utils::reader::ReadBuffer::Stdin;
    use firestore_rules::utils::reader::Reader;
    use firestore_rules::utils::writer::{WriteBuffer::Vec as WBVec, Writer};
    use firestore_rules::{parse, SourceFile};
    use indoc::formatdoc;
    use pretty_assertions::assert_eq;

    use crate::utils::{
        get_full_path_for_resource_file, read_from_resource_file, CommandTestRunner, StatusCode,
    };

    #[derive(Default)]
    struct ParseTreeTestRunner<'args> {
        rules: Option<&'args str>,
        dialect: Option<&'args str>,
        print_json: bool,
        print_yaml: bool,
    }

    impl<'args> ParseTreeTestRunner<'args> {
        fn rules(&'args mut self, arg: &'args str) -> &'args mut ParseTreeTestRunner {
            self.rules = Some(arg);
            self
        }

        fn dialect(&'args mut self, arg: &'args str) -> &'args mut ParseTreeTestRunner {
            self.dialect = Some(arg);
            self
        }

        fn print_yaml(&'args mut self) -> &'args mut ParseTreeTestRunner {
            self.print_yaml = true;
            self
        }

        fn print_json(&'args mut self) -> &'args mut ParseTreeTestRunner {
            self.print_json = true;
            self
        }
    }

    impl<'args> CommandTestRunner for ParseTreeTestRunner<'args> {
        fn build_args(&self) -> Vec<String> {
            let mut args = vec![String::from(PARSE_TREE)];

            if let Some(rules) = self.rules {
                args.push(format!("-{}", RULES.1));
                args.push(get_path_for_resource_file(rules));
            }

            if let Some(dialect) = self.dialect {
                args.push(format!("--{}", DIALECT.0));
                args.push(dialect.to_string());
            }

            if self.print_yaml {
                args.push(format!("--{}", PRINT_YAML.0));
            }

            if self.print_json {
                args.push(format!("--{}", PRINT_JSON.0));
            }

            args
        }
    }

    fn get_path_for_resource_file(file: &str) -> String {
        get_full_path_for_resource_file(&format!("resources/{}", file))
    }

    fn expected_tree(file: &str) -> SourceFile {
        parse(&read_from_resource_file(&format!("resources/{}", file))).unwrap()
    }

    #[test]
    fn test_json_output() {
        let mut reader = Reader::new(Stdin(std::io::stdin()));
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = ParseTreeTestRunner::default()
            .print_json()
            .rules("parse-tree/simple.rules")
            .run(&mut writer, &mut reader);

        assert_eq!(StatusCode::SUCCESS, status_code);
        let output = writer.stripped().unwrap();
        let tree: SourceFile = serde_json::from_str(&output).unwrap();
        assert_eq!(expected_tree("parse-tree/simple.rules"), tree);
    }

    #[rstest::rstest]
    #[case(false)]
    #[case(true)]
    fn test_yaml_output(#[case] explicit: bool) {
        let mut reader = Reader::new(Stdin(std::io::stdin()));
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = if explicit {
            ParseTreeTestRunner::default()
                .rules("check/valid/nested/posts.rules")
                .print_yaml()
                .run(&mut writer, &mut reader)
        } else {
            ParseTreeTestRunner::default()
                .rules("check/valid/nested/posts.rules")
                .run(&mut writer, &mut reader)
        };

        assert_eq!(StatusCode::SUCCESS, status_code);
        let output = writer.stripped().unwrap();
        assert!(output.contains("rules_version:"));
        let tree: SourceFile = serde_yaml::from_str(&output).unwrap();
        assert_eq!(expected_tree("check/valid/nested/posts.rules"), tree);
    }

    #[test]
    fn test_reads_rules_from_stdin() {
        let source = read_from_resource_file("resources/parse-tree/simple.rules");
        let mut reader = Reader::from_string(&source);
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = ParseTreeTestRunner::default()
            .print_json()
            .run(&mut writer, &mut reader);

        assert_eq!(StatusCode::SUCCESS, status_code);
        let tree: SourceFile = serde_json::from_str(&writer.stripped().unwrap()).unwrap();
        assert_eq!(parse(&source).unwrap(), tree);
    }

    #[test]
    fn test_parse_error_is_rendered() {
        let mut reader = Reader::new(Stdin(std::io::stdin()));
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = ParseTreeTestRunner::default()
            .rules("check/invalid/missing_return.rules")
            .run(&mut writer, &mut reader);

        assert_eq!(StatusCode::PARSING_ERROR, status_code);
        let expected = formatdoc! {"
            Structural error in {path} at line 5, column 5: function `isAdmin` must end with a `return` statement
              |
            5 |     }}
              |     ^

            ",
            path = get_path_for_resource_file("check/invalid/missing_return.rules")
        };
        assert_eq!(expected, writer.err_to_stripped().unwrap());
    }

    #[rstest::rstest]
    #[case("current", StatusCode::SUCCESS)]
    #[case("legacy", StatusCode::PARSING_ERROR)]
    fn test_dialect_gates_map_literals(#[case] dialect: &str, #[case] expected_status_code: i32) {
        let mut reader = Reader::new(Stdin(std::io::stdin()));
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = ParseTreeTestRunner::default()
            .rules("parse-tree/legacy_map.rules")
            .dialect(dialect)
            .run(&mut writer, &mut reader);

        assert_eq!(expected_status_code, status_code);
        let err = writer.err_to_stripped().unwrap();
        assert_eq!(
            expected_status_code == StatusCode::PARSING_ERROR,
            err.contains("map literals are not enabled in this grammar")
        );
    }

    #[test]
    fn test_missing_rules_file() {
        let mut reader = Reader::new(Stdin(std::io::stdin()));
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = ParseTreeTestRunner::default()
            .rules("parse-tree/dne.rules")
            .run(&mut writer, &mut reader);

        assert_eq!(StatusCode::INTERNAL_FAILURE, status_code);
        assert_eq!(
            format!(
                "Error occurred The path `{}` does not exist\n",
                get_path_for_resource_file("parse-tree/dne.rules")
            ),
            writer.err_to_stripped().unwrap()
        );
    }
}
