//! `{{ name }}` placeholder interpolation for paths and commands.
//!
//! Profiles may refer to values that are only known once the run starts,
//! such as the resolved home directory. Only a fixed set of names exists;
//! anything else is a configuration error rather than being left in place.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::error::ProvisionError;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// Values available to interpolation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables {
    pub home_dir: String,
    pub domain: String,
    pub jwt_issuer: String,
}

impl Variables {
    fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            "home_dir" => Some(&self.home_dir),
            "domain" => Some(&self.domain),
            "jwt_issuer" => Some(&self.jwt_issuer),
            _ => None,
        }
    }
}

/// Replaces every `{{ name }}` in `input` with its value.
pub fn interpolate(input: &str, vars: &Variables) -> Result<String, ProvisionError> {
    let mut unknown = None;
    let rendered = PLACEHOLDER.replace_all(input, |caps: &Captures<'_>| {
        let name = &caps[1];
        match vars.lookup(name) {
            Some(value) => value.to_string(),
            None => {
                unknown.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    if let Some(name) = unknown {
        return Err(ProvisionError::Configuration(format!(
            "unknown placeholder '{{{{{}}}}}' in '{}'",
            name, input
        )));
    }
    Ok(rendered.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> Variables {
        Variables {
            home_dir: "/home/ubuntu".to_string(),
            domain: "api.example.com".to_string(),
            jwt_issuer: "https://auth.example.com".to_string(),
        }
    }

    #[test]
    fn test_plain_text_is_unchanged() {
        assert_eq!(interpolate("sudo apt update", &vars()).unwrap(), "sudo apt update");
    }

    #[test]
    fn test_known_placeholders_are_replaced() {
        assert_eq!(
            interpolate("{{home_dir}}/ROOT.war", &vars()).unwrap(),
            "/home/ubuntu/ROOT.war"
        );
        assert_eq!(
            interpolate("certbot -d {{ domain }} --iss {{jwt_issuer}}", &vars()).unwrap(),
            "certbot -d api.example.com --iss https://auth.example.com"
        );
    }

    #[test]
    fn test_unknown_placeholder_is_rejected() {
        let err = interpolate("{{ build_name }}/app", &vars()).unwrap_err();
        assert!(matches!(err, ProvisionError::Configuration(_)));
        assert!(err.to_string().contains("unknown placeholder '{{build_name}}'"));
    }

    #[test]
    fn test_nginx_variables_are_not_placeholders() {
        let line = "try_files $uri $uri/ =404; location / { proxy_pass http://localhost:8000; }";
        assert_eq!(interpolate(line, &vars()).unwrap(), line);
    }
}
