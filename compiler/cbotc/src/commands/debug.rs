//! The `lex` command: dump the token stream.

use cbot_ir::TokenType;

use super::{read_file, report};

/// Tokenize `path` and print one token per line.
pub fn lex_file(path: &str) {
    let source = read_file(path);
    let tokens = match cbot_lexer::tokenize_plain(&source) {
        Ok(tokens) => tokens,
        Err(err) => {
            report(&err, &source, path);
            std::process::exit(1);
        }
    };

    println!("Tokens for '{}' ({} tokens):", path, tokens.len());
    for token in tokens.iter() {
        let text = match (token.ty, token.kw) {
            (TokenType::Eof, _) => "<eof>".to_owned(),
            (_, Some(kw)) => format!("{kw:?}"),
            _ => format!("{:?}", token.text),
        };
        println!("  {:?} {text} @ {}", token.ty, token.span);
    }
}
