use anyhow::{anyhow, Context};
use firestore_rules::{
    command::Command,
    commands::fmt::Fmt,
    parse, parse_with,
    utils::{
        reader::Reader,
        writer::{WriteBuffer, Writer},
    },
    Dialect, Grammar, Lexer, TokenKind,
};

const RULES: &str = r#"
rules_version = '2';
service cloud.firestore {
  match /databases/{database}/documents {
    function isOwner(uid) { return request.auth.uid == uid; }
    match /profiles/{uid} {
      allow read;
      allow write: if isOwner(uid) && request.resource.data.size() is int;
    }
  }
}
"#;

fn main() -> anyhow::Result<()> {
    // token stream
    let words = Lexer::new(RULES)
        .filter_map(Result::ok)
        .filter(|token| token.kind == TokenKind::Identifier)
        .count();
    println!("{words} identifiers");

    // syntax tree
    let rules = parse(RULES).map_err(|diagnostic| anyhow!(diagnostic.render(RULES, "inline")))?;
    for function in rules.functions() {
        println!("function {} at {}", function.name.name, function.span.start);
    }
    let tree = serde_json::to_string(&rules.service).context("failed to serialize service")?;
    println!("{tree}");

    // the same rules under the older grammar fail on the type test
    if let Err(diagnostic) = parse_with(RULES, &Grammar::new(Dialect::Legacy)) {
        print!("{}", diagnostic.render(RULES, "inline"));
    }

    // canonical formatting through the command interface
    let fmt = Fmt::new();
    let matches = fmt.command().get_matches_from(vec!["fmt"]);
    let mut reader = Reader::from_string(RULES);
    let mut writer = Writer::new(WriteBuffer::Vec(vec![]), WriteBuffer::Vec(vec![]));
    let status = fmt.execute(&matches, &mut writer, &mut reader)?;
    let content = writer.stripped().context("failed to read from writer")?;
    println!("{content}exit status {status}");

    Ok(())
}
