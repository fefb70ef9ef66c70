// #![include_doc("../README.md", start)]
//! # uri-template-guess
//!
//! RFC6570 URI Template Level 4 expansion and reverse matching
//!
//! ## Overview
//!
//! `uri-template-guess` expands [RFC6570] URI Templates (levels 1 to 4) and, given a URI and the template it came from, recovers the variable values that would have produced it.
//!
//! RFC6570 only defines expansion. Expansion throws information away, so reverse matching is best effort: templates with one variable per expression, or with named (`;`, `?`, `&`) expressions, round-trip; several positional variables in one expression are assigned by heuristics.
//!
//! ## Features
//!
//! - Every RFC6570 operator: `{var}`, `{+var}`, `{#var}`, `{.var}`, `{/var}`, `{;var}`, `{?var}`, `{&var}`
//! - Prefix (`{var:3}`) and explode (`{var*}`) modifiers
//! - String, list and map values
//! - Recovering variables from a URI
//!
//! ## Installation
//!
//! Add the following to your Cargo.toml:
//!
//! ```toml
//! [dependencies]
//! uri-template-guess = "0.1.0"
//! ```
//!
//! ## Usage
//!
//! ### Expansion
//!
//! ```rust
//! use std::collections::BTreeMap;
//! use uri_template_guess::{UriTemplate, Value};
//!
//! let template = UriTemplate::new("/users/{id}/files{/path*}{?q}");
//! let mut vars = BTreeMap::new();
//! vars.insert("id", Value::from("xxx"));
//! vars.insert("path", Value::list(["a", "b c"]));
//! vars.insert("q", Value::from("hello world!"));
//!
//! let uri = template.fill(&vars);
//! assert_eq!(uri, "/users/xxx/files/a/b%20c?q=hello%20world%21");
//! ```
//!
//! ### Recovering variables
//!
//! ```rust
//! use uri_template_guess::{UriTemplate, Value};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let template = UriTemplate::new("{+path}/c/capture{/date,id,page}");
//!     let vars = template
//!         .from_uri("/a/b/c/capture/20140101/1")?
//!         .expect("literal text lines up");
//!
//!     assert_eq!(vars["path"], Value::from("/a/b"));
//!     assert_eq!(vars["date"], Value::from("20140101"));
//!     assert_eq!(vars["id"], Value::from("1"));
//!     assert!(!vars.contains_key("page"));
//!
//!     assert_eq!(template.fill(&vars), "/a/b/c/capture/20140101/1");
//!     Ok(())
//! }
//! ```
//!
//! ## License
//!
//! This project is dual licensed under Apache-2.0/MIT (`license = "MIT OR Apache-2.0"` in Cargo.toml), at your option.
//!
//! ## Contribution
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted for inclusion in the work by you, as defined in the Apache-2.0 license, shall be dual licensed as above, without any additional terms or conditions.
//!
//! [RFC6570]: https://datatracker.ietf.org/doc/html/rfc6570
// #![include_doc("../README.md", end)]
