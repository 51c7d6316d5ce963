//! IAM policy references

/// Account owning AWS-managed policies
pub const AWS_MANAGED: &str = "aws";

/// A managed policy, resolved to its ARN
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IamPolicy {
    arn: String,
}

impl IamPolicy {
    /// Resolve a configured policy reference
    ///
    /// A full ARN is kept as is; a bare name becomes
    /// `arn:aws:iam::<account>:policy/<name>`.
    pub fn resolve(account: &str, reference: &str) -> Self {
        let reference = reference.trim();
        if reference.starts_with("arn:") {
            return Self {
                arn: reference.to_string(),
            };
        }
        let account = if account.is_empty() {
            AWS_MANAGED
        } else {
            account
        };
        Self {
            arn: format!(
                "arn:aws:iam::{}:policy/{}",
                account,
                reference.trim_start_matches('/')
            ),
        }
    }

    pub fn arn(&self) -> &str {
        &self.arn
    }
}

impl std::fmt::Display for IamPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.arn)
    }
}
