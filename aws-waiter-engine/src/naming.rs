//! Command-line names derived from model names

use convert_case::{Boundary, Case, Casing};

/// Only a digit followed by an uppercase letter starts a new word
const ATTACHED_DIGITS: [Boundary; 3] = [
    Boundary::LOWER_DIGIT,
    Boundary::UPPER_DIGIT,
    Boundary::DIGIT_LOWER,
];

/// Convert a PascalCase model name to a lowercase hyphen-separated name.
///
/// `InstanceRunning` becomes `instance-running`, `DBInstanceAvailable`
/// becomes `db-instance-available`. Digits stay attached to the word before
/// them, so `Ipv6CidrBlock` becomes `ipv6-cidr-block`.
pub fn to_cli_name(name: &str) -> String {
    name.without_boundaries(&ATTACHED_DIGITS)
        .to_case(Case::Kebab)
}
