//! Bounded overwrite of a string's leading characters

use oracle::{CheckError, DiscardReason, InvariantChecker, Violation};

/// Replace the first `count` characters of `text` with `fill`.
///
/// Counts past the end replace every character; the character count of the
/// result always equals the input's.
pub fn overwrite_chars(text: &str, fill: char, count: usize) -> String {
    text.chars()
        .enumerate()
        .map(|(index, ch)| if index < count { fill } else { ch })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverwriteInput {
    pub text: String,
    pub fill: char,
    pub count: i64,
}

/// Characters at or after `count` survive an overwrite unchanged.
///
/// Generic over the overwrite under test so alternative implementations can be
/// checked against the same law; [`BoundedOverwriteChecker::new`] with
/// [`overwrite_chars`] checks the reference one.
#[derive(Clone, Copy)]
pub struct BoundedOverwriteChecker<F> {
    overwrite: F,
}

impl<F> BoundedOverwriteChecker<F>
where
    F: Fn(&str, char, usize) -> String,
{
    pub fn new(overwrite: F) -> Self {
        Self { overwrite }
    }
}

impl<F> InvariantChecker for BoundedOverwriteChecker<F>
where
    F: Fn(&str, char, usize) -> String,
{
    type Input = OverwriteInput;

    fn name(&self) -> &'static str {
        "bounded_overwrite"
    }

    fn check(&self, input: &OverwriteInput) -> Result<(), CheckError> {
        let length = input.text.chars().count();
        let count = usize::try_from(input.count)
            .ok()
            .filter(|count| *count <= length)
            .ok_or_else(|| {
                DiscardReason::out_of_bounds(format!(
                    "count {} for a string of {} characters",
                    input.count, length
                ))
            })?;

        let output = (self.overwrite)(&input.text, input.fill, count);
        let output_length = output.chars().count();
        if output_length != length {
            return Err(Violation::new(self.name(), "overwrite changed the string length")
                .with_context(format!("{} -> {} characters", length, output_length))
                .into());
        }

        let changed = input
            .text
            .chars()
            .zip(output.chars())
            .enumerate()
            .skip(count)
            .find(|(_, (before, after))| before != after);

        if let Some((index, (before, after))) = changed {
            return Err(Violation::new(
                self.name(),
                format!("character {} changed beyond the overwritten prefix", index),
            )
            .with_context(format!("{:?} -> {:?} with count {}", before, after, count))
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overwrite_chars() {
        assert_eq!(overwrite_chars("hello", '*', 2), "**llo");
        assert_eq!(overwrite_chars("hello", '*', 0), "hello");
        assert_eq!(overwrite_chars("hello", '*', 9), "*****");
        assert_eq!(overwrite_chars("héllo", 'x', 2), "xxllo");
        assert_eq!(overwrite_chars("", 'x', 3), "");
    }

    #[test]
    fn test_checker_holds_within_bounds() {
        let checker = BoundedOverwriteChecker::new(overwrite_chars);
        for count in 0..=5 {
            let input = OverwriteInput {
                text: "日本語ab".to_string(),
                fill: '#',
                count,
            };
            assert!(checker.check(&input).is_ok(), "count {}", count);
        }
    }

    #[test]
    fn test_out_of_bounds_counts_discard() {
        let checker = BoundedOverwriteChecker::new(overwrite_chars);
        let base = OverwriteInput {
            text: "abc".to_string(),
            fill: '-',
            count: 0,
        };

        let negative = OverwriteInput {
            count: -1,
            ..base.clone()
        };
        assert!(checker.check(&negative).unwrap_err().is_discard());

        let too_long = OverwriteInput { count: 4, ..base };
        assert!(checker.check(&too_long).unwrap_err().is_discard());
    }

    #[test]
    fn test_inclusive_bound_is_violation() {
        fn inclusive(text: &str, fill: char, count: usize) -> String {
            text.chars()
                .enumerate()
                .map(|(index, ch)| if index <= count { fill } else { ch })
                .collect()
        }

        let checker = BoundedOverwriteChecker::new(inclusive);
        let input = OverwriteInput {
            text: "hello".to_string(),
            fill: '*',
            count: 2,
        };

        let violation = match checker.check(&input) {
            Err(CheckError::Violation(violation)) => violation,
            other => panic!("expected a violation, got {:?}", other),
        };
        assert_eq!(violation.property, "bounded_overwrite");
        assert!(violation.message.contains("character 2"));

        // Overwriting everything leaves no suffix for the extra write to reach
        let full = OverwriteInput { count: 5, ..input };
        assert!(checker.check(&full).is_ok());
    }

    #[test]
    fn test_length_change_is_violation() {
        let checker = BoundedOverwriteChecker::new(|text: &str, fill: char, count: usize| {
            let mut out: String = std::iter::repeat_n(fill, count).collect();
            out.push_str(text);
            out
        });
        let input = OverwriteInput {
            text: "abc".to_string(),
            fill: '-',
            count: 1,
        };

        match checker.check(&input) {
            Err(CheckError::Violation(violation)) => {
                assert!(violation.message.contains("length"));
                assert_eq!(violation.context.as_deref(), Some("3 -> 4 characters"));
            }
            other => panic!("expected a violation, got {:?}", other),
        }
    }
}
