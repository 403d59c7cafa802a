// Command-line tokenizer: words split on spaces and tabs, with
// double-quoted segments that may contain whitespace.

#[derive(Debug, PartialEq, Eq)]
pub enum TokenizeError {
    UnclosedQuote,
}

/// Split an input line into tokens. The first token is the command name.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quote = false;

    for ch in line.chars() {
        match ch {
            '"' => {
                in_quote = !in_quote;
                in_token = true;
            }
            ' ' | '\t' if !in_quote => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            _ => {
                current.push(ch);
                in_token = true;
            }
        }
    }

    if in_quote {
        return Err(TokenizeError::UnclosedQuote);
    }
    if in_token {
        tokens.push(current);
    }
    Ok(tokens)
}
