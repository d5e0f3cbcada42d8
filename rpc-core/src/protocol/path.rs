// SPDX-License-Identifier: BSD-3-Clause
// Copyright 2025. Triad National Security, LLC.

use std::fmt;
use std::str::FromStr;

use crate::error::LifecycleError;

/// The triplet `(appid, class, method)` that names a callable procedure, encoded on the wire
/// and in proxy calls as `"appid.class.method"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePath {
    pub appid: String,
    pub class: String,
    pub method: String,
}

impl FromStr for ServicePath {
    type Err = LifecycleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();
        let [appid, class, method] = parts.as_slice() else {
            return Err(LifecycleError::InvalidServicePath(s.to_string()));
        };

        if appid.is_empty() || class.is_empty() || method.is_empty() {
            return Err(LifecycleError::InvalidServicePath(s.to_string()));
        }

        Ok(Self {
            appid: appid.to_string(),
            class: class.to_string(),
            method: method.to_string(),
        })
    }
}

impl fmt::Display for ServicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.appid, self.class, self.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_three_segments() {
        let path: ServicePath = "UserService.User.GetUserByID".parse().unwrap();
        assert_eq!(path.appid, "UserService");
        assert_eq!(path.class, "User");
        assert_eq!(path.method, "GetUserByID");
    }

    #[test]
    fn rejects_wrong_segment_count() {
        assert!("UserService.User".parse::<ServicePath>().is_err());
        assert!("UserService.User.Get.Extra".parse::<ServicePath>().is_err());
    }

    #[test]
    fn rejects_empty_segment() {
        assert!("UserService..GetUserByID".parse::<ServicePath>().is_err());
    }
}
