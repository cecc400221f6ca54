//
// dataid.rs -- datum identifier codec
//
// This file is part of the bucketfile software project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT

//! A datum id is the opaque string handed back for every stored payload:
//! `bucketId:fileId:indexHex`, with the bucket index rendered in lowercase
//! hexadecimal without a prefix. The leading `bucketId:fileId` part is the
//! file identity; bucket and file ids are caller-supplied opaque strings
//! that must not contain `:`.

use crate::{Error, Result};

/// File identity of a bucket/file id pair.
pub fn identity(bucket_id: &str, file_id: &str) -> String {
    format!("{bucket_id}:{file_id}")
}

/// Renders the datum id of the slot at `index` within `identity`.
pub fn render(identity: &str, index: i32) -> String {
    format!("{identity}:{index:x}")
}

/// Splits a datum id at its last `:` into file identity and bucket index.
pub fn parse(data_id: &str) -> Result<(&str, i32)> {
    let (identity, hex) = data_id
        .rsplit_once(':')
        .ok_or_else(|| Error::BadDataId(data_id.to_string()))?;

    let index = i64::from_str_radix(hex, 16)
        .map_err(|_| Error::BadDataId(data_id.to_string()))?;
    if index < 0 || index > i32::MAX as i64 {
        return Err(Error::BadDataId(data_id.to_string()));
    }

    Ok((identity, index as i32))
}
