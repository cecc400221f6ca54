//
// ser.rs -- bucket file serialization helpers
//
// This file is part of the bucketfile software project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT

// All on-disk integers are fixed-width little-endian.

use std::io::{self, Read};

pub fn read_u8(rdr: &mut impl Read) -> io::Result<u8> {
    let mut buf = [0u8; 1];
    rdr.read_exact(&mut buf)?;
    Ok(buf[0])
}

pub fn read_i8(rdr: &mut impl Read) -> io::Result<i8> {
    read_u8(rdr).map(|v| v as i8)
}

pub fn read_u16(rdr: &mut impl Read) -> io::Result<u16> {
    let mut buf = [0u8; 2];
    rdr.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

pub fn read_i16(rdr: &mut impl Read) -> io::Result<i16> {
    read_u16(rdr).map(|v| v as i16)
}

pub fn read_i32(rdr: &mut impl Read) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    rdr.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

pub fn read_i64(rdr: &mut impl Read) -> io::Result<i64> {
    let mut buf = [0u8; 8];
    rdr.read_exact(&mut buf)?;
    Ok(i64::from_le_bytes(buf))
}

// serialize helpers, one per stored width
pub fn w8(val: u8) -> Vec<u8> {
    vec![val]
}

pub fn w8i(val: i8) -> Vec<u8> {
    vec![val as u8]
}

pub fn w16(val: u16) -> Vec<u8> {
    val.to_le_bytes().to_vec()
}

pub fn w16i(val: i16) -> Vec<u8> {
    val.to_le_bytes().to_vec()
}

pub fn w32i(val: i32) -> Vec<u8> {
    val.to_le_bytes().to_vec()
}

pub fn w64i(val: i64) -> Vec<u8> {
    val.to_le_bytes().to_vec()
}
