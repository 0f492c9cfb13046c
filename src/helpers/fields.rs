use memchr::{memchr, memchr_iter};
use std::borrow::Cow;

/// Splits one CSV line into fields.
///
/// Lines without a double quote take the zero-copy path. Otherwise a field
/// wrapped in quotes may contain the delimiter, and `""` inside it is an
/// escaped quote.
pub fn split_fields<'a>(line: &'a [u8], delimiter: u8, out: &mut Vec<Cow<'a, [u8]>>) {
    out.clear();

    if memchr(b'"', line).is_none() {
        let mut field_start = 0;
        for pos in memchr_iter(delimiter, line) {
            out.push(Cow::Borrowed(&line[field_start..pos]));
            field_start = pos + 1;
        }
        out.push(Cow::Borrowed(&line[field_start..]));
        return;
    }

    let mut field = Vec::new();
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut i = 0;
    while i < line.len() {
        let b = line[i];
        if in_quotes {
            if b == b'"' {
                if line.get(i + 1) == Some(&b'"') {
                    field.push(b'"');
                    i += 1;
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(b);
            }
        } else if b == delimiter {
            out.push(Cow::Owned(std::mem::take(&mut field)));
            at_field_start = true;
            i += 1;
            continue;
        } else if b == b'"' && at_field_start {
            in_quotes = true;
        } else {
            // a quote inside an unquoted field is literal
            field.push(b);
        }
        at_field_start = false;
        i += 1;
    }
    out.push(Cow::Owned(field));
}

/// Strips a trailing carriage return.
pub fn trim_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(line: &str) -> Vec<String> {
        let mut out = Vec::new();
        split_fields(line.as_bytes(), b',', &mut out);
        out.iter()
            .map(|f| String::from_utf8_lossy(f).to_string())
            .collect()
    }

    #[test]
    fn test_plain_split() {
        assert_eq!(split("a,b,,c"), vec!["a", "b", "", "c"]);
    }

    #[test]
    fn test_quoted_delimiter_and_escaped_quote() {
        assert_eq!(
            split(r#"1,"Chairs, Office","say ""hi""",x"#),
            vec!["1", "Chairs, Office", r#"say "hi""#, "x"]
        );
    }

    #[test]
    fn test_quote_inside_unquoted_field_is_literal() {
        assert_eq!(
            split(r#"East,Monitor 27" Wide,P1"#),
            vec!["East", r#"Monitor 27" Wide"#, "P1"]
        );
        assert_eq!(split(r#"a,b"c,"d,e""#), vec!["a", r#"b"c"#, "d,e"]);
    }

    #[test]
    fn test_trim_cr() {
        assert_eq!(trim_cr(b"a,b\r"), b"a,b");
        assert_eq!(trim_cr(b"a,b"), b"a,b");
    }
}
