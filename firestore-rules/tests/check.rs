// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: Apache-2.0

pub(crate) mod utils;

#[cfg(test)]
mod check_tests {
    use firestore_rules::commands::{CHECK, DIALECT, RULES};
    use firestore_rules::utils::reader::ReadBuffer::Stdin;
    use firestore_rules::utils::reader::Reader;
    use firestore_rules::utils::writer::{WriteBuffer::Vec as WBVec, Writer};
    use indoc::formatdoc;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use crate::assert_output_from_str_eq;
    use crate::utils::{get_full_path_for_resource_file, CommandTestRunner, StatusCode};

    #[derive(Default)]
    struct CheckTestRunner<'args> {
        rules: Vec<&'args str>,
        dialect: Option<&'args str>,
    }

    impl<'args> CheckTestRunner<'args> {
        fn rules(&'args mut self, args: Vec<&'args str>) -> &'args mut CheckTestRunner {
            self.rules = args;
            self
        }

        fn dialect(&'args mut self, arg: &'args str) -> &'args mut CheckTestRunner {
            self.dialect = Some(arg);
            self
        }
    }

    impl<'args> CommandTestRunner for CheckTestRunner<'args> {
        fn build_args(&self) -> Vec<String> {
            let mut args = vec![String::from(CHECK)];

            for rules in &self.rules {
                args.push(format!("-{}", RULES.1));
                args.push(get_path_for_resource_file(rules));
            }

            if let Some(dialect) = self.dialect {
                args.push(format!("-{}", DIALECT.1));
                args.push(dialect.to_string());
            }

            args
        }
    }

    fn get_path_for_resource_file(file: &str) -> String {
        get_full_path_for_resource_file(&format!("resources/{}", file))
    }

    #[rstest]
    #[case(vec!["check/valid/users.rules"], StatusCode::SUCCESS)]
    #[case(vec!["check/valid"], StatusCode::SUCCESS)]
    #[case(vec!["check/valid", "check/invalid/missing_return.rules"], StatusCode::CHECK_FAILURE)]
    #[case(vec!["check"], StatusCode::CHECK_FAILURE)]
    #[case(vec!["check/valid", "check/dne"], StatusCode::PARSING_ERROR)]
    #[case(vec!["check/invalid", "check/dne"], StatusCode::PARSING_ERROR)]
    fn test_status_codes(#[case] rules: Vec<&str>, #[case] expected_status_code: i32) {
        let mut reader = Reader::new(Stdin(std::io::stdin()));
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = CheckTestRunner::default()
            .rules(rules)
            .run(&mut writer, &mut reader);

        assert_eq!(expected_status_code, status_code);
    }

    #[test]
    fn test_directory_report() {
        let mut reader = Reader::new(Stdin(std::io::stdin()));
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = CheckTestRunner::default()
            .rules(vec!["check"])
            .run(&mut writer, &mut reader);

        assert_eq!(StatusCode::CHECK_FAILURE, status_code);
        let expected = formatdoc! {"
            FAIL {dir}/invalid/empty_capture.rules
            Syntax error in {dir}/invalid/empty_capture.rules at line 3, column 11: expected capture name in path segment, found `}}`
              |
            3 |     match /{{}} {{
              |           ^^^
            FAIL {dir}/invalid/missing_return.rules
            Structural error in {dir}/invalid/missing_return.rules at line 5, column 5: function `isAdmin` must end with a `return` statement
              |
            5 |     }}
              |     ^
            PASS {dir}/valid/nested/posts.rules
            PASS {dir}/valid/users.rules
            ",
            dir = get_path_for_resource_file("check")
        };
        assert_output_from_str_eq!(&expected, writer);
    }

    #[test]
    fn test_legacy_dialect_rejects_type_tests() {
        let mut reader = Reader::new(Stdin(std::io::stdin()));
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = CheckTestRunner::default()
            .rules(vec!["check/valid/users.rules"])
            .dialect("legacy")
            .run(&mut writer, &mut reader);

        assert_eq!(StatusCode::CHECK_FAILURE, status_code);
        let output = writer.stripped().unwrap();
        assert!(output.starts_with("FAIL "));
        assert!(output.contains("type tests are not enabled in this grammar"));
    }

    #[test]
    fn test_missing_path_is_reported() {
        let mut reader = Reader::new(Stdin(std::io::stdin()));
        let mut writer = Writer::new(WBVec(vec![]), WBVec(vec![]));
        let status_code = CheckTestRunner::default()
            .rules(vec!["check/dne"])
            .run(&mut writer, &mut reader);

        assert_eq!(StatusCode::PARSING_ERROR, status_code);
        assert_eq!(
            format!(
                "The path `{}` does not exist\n",
                get_path_for_resource_file("check/dne")
            ),
            writer.err_to_stripped().unwrap()
        );
    }
}
