use crate::amf::markers;
use crate::{ByteCursor, Error, Result};

/// What a command or data message scan yields: the leading command name and
/// the transaction number the response must echo.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CommandScan {
    pub name: Option<String>,
    pub transaction_id: Option<f64>,
}

/// Walk the AMF0 values of a command/data message payload.
///
/// The first top-level string becomes the command name and the first
/// top-level number the transaction id; every other value is skipped.
/// An unknown tag byte aborts the walk.
pub fn scan_command(payload: &[u8]) -> Result<CommandScan> {
    let mut cursor = ByteCursor::new(payload);
    let mut scan = CommandScan::default();

    while !cursor.is_empty() {
        let marker = cursor.read_u8();
        match marker {
            markers::STRING if scan.name.is_none() => {
                scan.name = Some(read_string(&mut cursor)?);
            }
            markers::NUMBER if scan.transaction_id.is_none() => {
                let value = cursor.read_double();
                if cursor.is_truncated() {
                    return Err(Error::amf("truncated AMF0 number"));
                }
                scan.transaction_id = Some(value);
            }
            other => skip_value(&mut cursor, other)?,
        }
    }

    Ok(scan)
}

fn read_string(cursor: &mut ByteCursor) -> Result<String> {
    let len = cursor.read_u16() as usize;
    let bytes = cursor.read_data(len);
    if cursor.is_truncated() {
        return Err(Error::amf("truncated AMF0 string"));
    }
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::amf(format!("invalid UTF-8 in AMF0 string: {}", e)))
}

fn skip_value(cursor: &mut ByteCursor, marker: u8) -> Result<()> {
    match marker {
        markers::NUMBER => {
            cursor.read_double();
        }
        markers::BOOLEAN => {
            cursor.read_u8();
        }
        markers::STRING => {
            let len = cursor.read_u16() as usize;
            cursor.read_data(len);
        }
        markers::OBJECT => skip_object_body(cursor)?,
        markers::NULL | markers::UNDEFINED => {}
        markers::REFERENCE => {
            cursor.read_u16();
        }
        markers::ECMA_ARRAY => {
            cursor.read_u32(); // declared entry count, the walk stops on the end key
            skip_object_body(cursor)?;
        }
        markers::OBJECT_END => {}
        other => {
            return Err(Error::amf(format!("unknown AMF0 marker 0x{:02x}", other)));
        }
    }
    if cursor.is_truncated() {
        return Err(Error::amf("truncated AMF0 value"));
    }
    Ok(())
}

/// Skip key/value pairs until the zero-length key + end marker
fn skip_object_body(cursor: &mut ByteCursor) -> Result<()> {
    loop {
        let key_len = cursor.read_u16() as usize;
        cursor.read_data(key_len);
        if cursor.is_truncated() {
            return Err(Error::amf("truncated AMF0 object key"));
        }
        if key_len == 0 {
            let end = cursor.read_u8();
            if cursor.is_truncated() {
                return Err(Error::amf("truncated AMF0 object end"));
            }
            if end != markers::OBJECT_END {
                return Err(Error::amf(format!(
                    "expected object end marker, found 0x{:02x}",
                    end
                )));
            }
            return Ok(());
        }
        let marker = cursor.read_u8();
        if cursor.is_truncated() {
            return Err(Error::amf("truncated AMF0 object value"));
        }
        skip_value(cursor, marker)?;
    }
}
