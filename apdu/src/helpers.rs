// Copyright (c) 2022-2023 The MobileCoin Foundation

use crate::ApduError;

/// Pop a size-prefixed field from the front of a response buffer,
/// returning the remaining buffer, the declared length, and the field value
pub fn unpack_sized_field(buff: &[u8]) -> Result<(&[u8], usize, &[u8]), ApduError> {
    let (len, rest) = match buff.split_first() {
        Some((l, r)) => (*l as usize, r),
        None => return Err(ApduError::Truncated),
    };

    if rest.len() < len {
        return Err(ApduError::Truncated);
    }

    let (value, remaining) = rest.split_at(len);

    Ok((remaining, len, value))
}

/// Write a size-prefixed field into the provided buffer, returning the written length
pub fn pack_sized_field(value: &[u8], buff: &mut [u8]) -> Result<usize, ApduError> {
    if value.len() > u8::MAX as usize || buff.len() < value.len() + 1 {
        return Err(ApduError::InvalidLength);
    }

    buff[0] = value.len() as u8;
    buff[1..][..value.len()].copy_from_slice(value);

    Ok(value.len() + 1)
}
