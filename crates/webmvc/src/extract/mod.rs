//! Argument extraction: from a request to the ordered arguments of a handler.
//!
//! Extraction runs in two steps. [`RequestValueSet`] flattens the query string, form body,
//! path parameters and json body into one key to text map, then [`ArgumentBinder`] turns
//! that map into typed [`Args`] following the handler's declared parameters.
//!
//! # Example
//! ```
//! # use micro_webmvc::extract::{ArgumentBinder, RequestValueSet};
//! # use micro_webmvc::convert::TypeConverter;
//! # use micro_webmvc::param::ParamSpec;
//! # use micro_webmvc::rule::RegexRuleChecker;
//! let converter = TypeConverter::new();
//! let rules = RegexRuleChecker::new();
//! let values = [("age", "18")].into_iter().collect::<RequestValueSet>();
//!
//! let mut args = ArgumentBinder::new(&converter, &rules)
//!     .bind(&[ParamSpec::scalar::<u32>("age")], &values)
//!     .unwrap();
//! assert_eq!(args.take::<u32>("age").unwrap(), 18);
//! ```

mod args;
mod binder;
mod value_set;

pub use args::{Arg, Args};
pub use binder::ArgumentBinder;
pub use value_set::RequestValueSet;
