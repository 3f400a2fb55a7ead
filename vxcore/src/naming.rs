//! Names produced for the back end.
//!
//! Kernel names are a digest of the frontend name. The runtime recomputes the
//! same digest from the names recorded in the integration header, so
//! [`kernel_digest`] must stay bit-exact.
use log::debug;
use uuid::Uuid;
use vxinstr::modules::Function;

use crate::magic::{
    ARG_NAME_PREFIX, DIGEST_FOLD_CONSTANT, HELPER_NAME_PREFIX, KERNEL_NAME_PREFIX,
    MAX_KERNEL_NAME_LEN,
};

/// Name-based UUID (version 5, SHA-1 in the DNS namespace) of `name`.
pub fn name_uuid(name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, name.as_bytes())
}

/// Fold the 16 bytes of a UUID into a 64-bit value.
///
/// This is the `hash_combine` fold the runtime applies to its UUIDs:
/// `seed ^= byte + 0x9e3779b9 + (seed << 6) + (seed >> 2)`, in wrapping 64-bit
/// arithmetic, starting from zero.
pub fn fold_uuid(uuid: &Uuid) -> u64 {
    uuid.as_bytes().iter().fold(0u64, |seed, &byte| {
        seed ^ (byte as u64)
            .wrapping_add(DIGEST_FOLD_CONSTANT)
            .wrapping_add(seed << 6)
            .wrapping_add(seed >> 2)
    })
}

pub fn kernel_digest(name: &str) -> u64 {
    fold_uuid(&name_uuid(name))
}

/// New name of the kernel originally called `name`.
pub fn kernel_name(name: &str) -> String {
    let renamed = format!("{}{}", KERNEL_NAME_PREFIX, kernel_digest(name));
    // u64::MAX has 20 digits, the prefix 5.
    debug_assert!(renamed.len() <= MAX_KERNEL_NAME_LEN);
    renamed
}

/// Returns `true` for names already produced by [`kernel_name`].
pub fn is_kernel_name(name: &str) -> bool {
    name.strip_prefix(KERNEL_NAME_PREFIX)
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

pub fn helper_name(index: usize) -> String {
    format!("{}{}", HELPER_NAME_PREFIX, index)
}

/// Give every unnamed parameter of `function` the name `arg_<n>`, where `n`
/// counts the unnamed parameters only. Returns the number of parameters named.
pub fn name_unnamed_params(function: &mut Function) -> usize {
    let mut counter = 0;
    for param in function.params.iter_mut().filter(|p| p.ident.is_none()) {
        param.ident = Some(format!("{}{}", ARG_NAME_PREFIX, counter));
        counter += 1;
    }
    if counter > 0 {
        debug!("Named {} parameters of '{}'", counter, function.name);
    }
    counter
}
