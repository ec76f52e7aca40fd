use regex::Regex;

use crate::utils::{Result, ShareError};

/// Gate applied to console input before anything reaches the tracker.
pub trait CommandValidator: Send + Sync {
    fn validate(&self, line: &str) -> bool;
}

const PATTERNS: [&str; 6] = [
    r"^\s*disconnect\s*$",
    r"^\s*list-files\s*$",
    r"^\s*list-users\s*$",
    // the tracker splits on whitespace, so registered names must not contain any
    r#"^\s*register\s+[a-z]+(\s+"[^"\s]+")+\s*$"#,
    r#"^\s*unregister\s+[a-z]+(\s+"[^"\s]+")+\s*$"#,
    r#"^\s*download\s+[a-z]+(\s+"[^"]+"){2}\s*$"#,
];

pub struct RegexValidator {
    patterns: Vec<Regex>,
}

impl RegexValidator {
    pub fn new() -> Result<Self> {
        let patterns = PATTERNS
            .iter()
            .map(|pattern| {
                Regex::new(pattern)
                    .map_err(|e| ShareError::ConfigError(format!("{}: {}", pattern, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { patterns })
    }
}

impl CommandValidator for RegexValidator {
    fn validate(&self, line: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.is_match(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_well_formed_commands() {
        let validator = RegexValidator::new().unwrap();

        for line in [
            "disconnect",
            "  list-files ",
            "list-users",
            "register alice \"a.txt\"",
            "register alice \"a.txt\" \"/tmp/b.bin\"",
            "unregister alice \"a.txt\"",
            "download bob \"/srv/remote file.txt\" \"local.txt\"",
        ] {
            assert!(validator.validate(line), "rejected {:?}", line);
        }
    }

    #[test]
    fn test_rejects_malformed_commands() {
        let validator = RegexValidator::new().unwrap();

        for line in [
            "",
            "register",
            "register alice",
            "register alice a.txt",
            "register Alice \"a.txt\"",
            "register alice \"my file.txt\"",
            "download bob \"only-one\"",
            "download bob \"a\" \"b\" \"c\"",
            "register-miniserver 127.0.0.1:1",
            "list-files now",
        ] {
            assert!(!validator.validate(line), "accepted {:?}", line);
        }
    }
}
