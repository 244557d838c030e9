// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! IAM role ARNs.
//!
//! A [`RoleArn`] is parsed from the canonical form
//! `arn:aws:iam::<account>:role<path><name>`, where `<path>` is `/` or a
//! slash-wrapped path such as `/service/`. Formatting a parsed ARN yields the
//! same canonical string, which is used as the credential cache key.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

static ROLE_ARN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^arn:aws:iam::([0-9]+):role(/(?:[^:/]+/)*)([^:/]+)$")
        .expect("role ARN pattern is valid")
});

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ArnError {
    #[error("invalid role ARN: {0}")]
    InvalidArn(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleArn {
    /// Account digits exactly as written; AWS account ids keep leading zeros.
    account: String,
    path: String,
    name: String,
}

impl RoleArn {
    pub fn parse(arn: &str) -> Result<Self, ArnError> {
        let captures = ROLE_ARN
            .captures(arn)
            .ok_or_else(|| ArnError::InvalidArn(arn.to_string()))?;

        let account = &captures[1];
        account
            .parse::<u64>()
            .map_err(|_| ArnError::InvalidArn(arn.to_string()))?;

        Ok(Self {
            account: account.to_string(),
            path: captures[2].to_string(),
            name: captures[3].to_string(),
        })
    }

    pub fn account_id(&self) -> u64 {
        // digits were validated as a u64 in `parse`
        self.account.parse().unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RoleArn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "arn:aws:iam::{}:role{}{}",
            self.account, self.path, self.name
        )
    }
}

impl FromStr for RoleArn {
    type Err = ArnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_role_without_path() {
        let arn = RoleArn::parse("arn:aws:iam::12345:role/testrole1").unwrap();
        assert_eq!(arn.account_id(), 12345);
        assert_eq!(arn.path(), "/");
        assert_eq!(arn.name(), "testrole1");
    }

    #[test]
    fn test_parse_role_with_path() {
        let arn = RoleArn::parse("arn:aws:iam::12345:role/testpath/testrole2").unwrap();
        assert_eq!(arn.account_id(), 12345);
        assert_eq!(arn.path(), "/testpath/");
        assert_eq!(arn.name(), "testrole2");
    }

    #[test]
    fn test_parse_role_with_nested_path() {
        let arn = RoleArn::parse("arn:aws:iam::12345:role/a/b/worker").unwrap();
        assert_eq!(arn.path(), "/a/b/");
        assert_eq!(arn.name(), "worker");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "arn:aws:iam::123fail:role:fail",
            "arn:aws:iam::fail123:role:fail",
            "arn:aws:iam::faifail:role:fail",
            "arn:aws:iam::12345:role:fail",
            "arn:aws:iam::12345:role/testpath:fail",
            "arn:aws:iam::12345:role/",
            "arn:aws:iam::12345:role/trailing/",
            "arn:aws:iam::-1:role/negative",
            "arn:aws:iam::99999999999999999999999:role/overflow",
            "arn:aws:sts::12345:role/wrongservice",
            "",
        ] {
            assert_eq!(
                RoleArn::parse(bad),
                Err(ArnError::InvalidArn(bad.to_string())),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_canonical_round_trip() {
        for arn in [
            "arn:aws:iam::12345:role/testrole1",
            "arn:aws:iam::12345:role/testpath/testrole2",
            "arn:aws:iam::012345678901:role/service-role/app.worker@prod",
        ] {
            let parsed = RoleArn::parse(arn).unwrap();
            assert_eq!(parsed.canonical(), arn);
            assert_eq!(RoleArn::parse(&parsed.canonical()).unwrap(), parsed);
        }
    }

    #[test]
    fn test_leading_zero_account_is_preserved() {
        let arn = RoleArn::parse("arn:aws:iam::000000012345:role/app").unwrap();
        assert_eq!(arn.account_id(), 12345);
        assert_eq!(arn.canonical(), "arn:aws:iam::000000012345:role/app");
    }

    #[test]
    fn test_from_str() {
        let arn: RoleArn = "arn:aws:iam::12345:role/app".parse().unwrap();
        assert_eq!(arn.name(), "app");
    }
}
