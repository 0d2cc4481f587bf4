use crate::Error;

/// Check that `name` can be used as a table or column name.
///
/// Identifiers cannot be bound as statement parameters, so everything that
/// ends up in DDL or DML text goes through here and through [`quote_ident`].
pub fn validate_ident(name: &str) -> Result<(), Error> {
    if name.is_empty() || name.chars().any(char::is_control) {
        return Err(Error::InvalidIdentifier(name.to_owned()));
    }
    Ok(())
}

/// Quote an identifier for SQL, doubling embedded quote characters.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_embedded_quotes() {
        assert_eq!(quote_ident("stop_id"), r#""stop_id""#);
        assert_eq!(
            quote_ident(r#"x"; DROP TABLE sp_stop; --"#),
            r#""x""; DROP TABLE sp_stop; --""#
        );
    }

    #[test]
    fn rejects_empty_and_control_characters() {
        assert!(validate_ident("").is_err());
        assert!(validate_ident("stop\0id").is_err());
        assert!(validate_ident("stop\nid").is_err());
        assert!(validate_ident("stop id").is_ok());
    }
}
