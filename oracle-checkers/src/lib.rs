//! # Oracle Checkers
//!
//! Stateless invariant checkers. Each one takes a single decoded input,
//! runs it and checks one property, with no model carried between inputs.
//!
//! | Checker | Property |
//! |---------|----------|
//! | [`RoundTripChecker`] | splitting money and re-adding the parts gives the original amount |
//! | [`DifferentialChecker`] | two parsers that both accept a document agree on its structure |
//! | [`PrefixContainmentChecker`] | a route pattern matching a path is a prefix of that path |
//! | [`BoundedOverwriteChecker`] | overwriting a prefix leaves the rest of the string alone |
//!
//! The route and overwrite checkers are generic over the implementation under
//! test: any [`PathMatcher`] or any `Fn(&str, char, usize) -> String`.
//!
//! Checkers plug into [`oracle::check`] and [`oracle::check_all`]:
//!
//! ```rust
//! use oracle::{check, check_all, CheckOutcome};
//! use oracle_checkers::{Currency, RoundTripChecker, SplitInput};
//!
//! let checker = RoundTripChecker;
//! let input = SplitInput { amount: 100, parts: 3, currency: Currency::GBP };
//! assert_eq!(check(&checker, &input), CheckOutcome::Holds);
//!
//! let inputs = (-3..=3).map(|parts| SplitInput { parts, ..input });
//! let report = check_all(&checker, inputs);
//! assert!(report.passed());
//! assert_eq!(report.discarded, 4);
//! ```

pub mod differential;
pub mod money;
pub mod overwrite;
pub mod routing;

pub use differential::{
    DifferentialChecker, Document, DocumentParser, JsonParser, ParseError, YamlParser,
};
pub use money::{Currency, MAX_SPLIT_PARTS, Money, MoneyError, RoundTripChecker, SplitInput};
pub use overwrite::{BoundedOverwriteChecker, OverwriteInput, overwrite_chars};
pub use routing::{
    DEFAULT_ROUTES, PathMatcher, PrefixContainmentChecker, RouteError, RouteTable,
    normalize_path,
};
