// Copyright 2026 Daniel Pelikan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Alarm text classification.
//!
//! Device messages carry no explicit category. The category of a record is
//! derived from its text with an ordered list of substring rules; the first
//! rule that matches wins, and text matching no rule gets the fallback.

use crate::transport::{Mode, Variant};

/// A single substring rule. Matching is case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Rule {
    needle: &'static str,
    kind: Mode,
}

/// Ordered rule list with a fallback category.
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
    fallback: Mode,
}

impl Classifier {
    /// Standard rules ("Away", then "Security") with the given fallback.
    pub fn new(fallback: Mode) -> Self {
        Self {
            rules: vec![
                Rule {
                    needle: "Away",
                    kind: Mode::Away,
                },
                Rule {
                    needle: "Security",
                    kind: Mode::Security,
                },
            ],
            fallback,
        }
    }

    /// Classifier used by a transport variant.
    pub fn for_variant(variant: Variant) -> Self {
        Self::new(variant.fallback_kind())
    }

    pub fn classify(&self, text: &str) -> Mode {
        self.rules
            .iter()
            .find(|rule| text.contains(rule.needle))
            .map(|rule| rule.kind)
            .unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_mode_table() {
        let classifier = Classifier::for_variant(Variant::Bluetooth);
        assert_eq!(classifier.classify("Away mode armed"), Mode::Away);
        assert_eq!(classifier.classify("Security mode armed"), Mode::Security);
        assert_eq!(classifier.classify("Motion detected"), Mode::Safe);
    }

    #[test]
    fn test_two_mode_table() {
        for variant in [Variant::Tcp, Variant::Http] {
            let classifier = Classifier::for_variant(variant);
            assert_eq!(classifier.classify("Away mode armed"), Mode::Away);
            assert_eq!(classifier.classify("Security mode armed"), Mode::Security);
            assert_eq!(classifier.classify("Motion detected"), Mode::Security);
        }
    }

    #[test]
    fn test_first_match_wins() {
        let classifier = Classifier::new(Mode::Safe);
        assert_eq!(classifier.classify("Security while Away"), Mode::Away);
        assert_eq!(classifier.classify("away from home"), Mode::Safe);
    }
}
