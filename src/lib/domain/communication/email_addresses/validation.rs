//! Address list validation

use super::{AddressError, AddressKind, EmailAddress, EmailAddressError};

/// Validates a single address, reporting the header it was destined for on
/// failure.
pub fn validate_address(raw: &str, kind: AddressKind) -> Result<EmailAddress, AddressError> {
    EmailAddress::new(raw).map_err(|err| match err {
        EmailAddressError::EmptyEmailAddress => AddressError::Empty { kind },
        EmailAddressError::InvalidEmailAddress => AddressError::Invalid {
            kind,
            address: raw.to_string(),
        },
    })
}

/// Validates a list of addresses for one recipient header.
///
/// With `ignore_errors` set, malformed entries are dropped and the remaining
/// valid addresses are returned; otherwise the first malformed entry fails the
/// whole list.
pub fn validate_addresses(
    addresses: &[String],
    kind: AddressKind,
    ignore_errors: bool,
) -> Result<Vec<EmailAddress>, AddressError> {
    let mut valid = Vec::with_capacity(addresses.len());

    for raw in addresses {
        match validate_address(raw, kind) {
            Ok(address) => valid.push(address),
            Err(_) if ignore_errors => continue,
            Err(err) => return Err(err),
        }
    }

    Ok(valid)
}
