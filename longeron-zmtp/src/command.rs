use crate::error::{Result, ZmtpError};

/// Parsed command body: name plus metadata properties (borrowed views
/// into the payload).
#[derive(Debug, Clone)]
pub struct Command<'a> {
    pub name: &'a [u8],
    pub props: Vec<Property<'a>>,
}

/// One metadata property.
#[derive(Debug, Clone, Copy)]
pub struct Property<'a> {
    pub name: &'a [u8],
    pub value: &'a [u8],
}

impl<'a> Command<'a> {
    /// Look up a property value by exact (case-sensitive) name.
    #[must_use]
    pub fn get(&self, name: &[u8]) -> Option<&'a [u8]> {
        self.props.iter().find(|p| p.name == name).map(|p| p.value)
    }
}

/// Parse a command payload (frame body) into name + properties.
///
/// Grammar: `[name_len: u8][name]` followed by repeated properties
/// `[prop_name_len: u8][prop_name][value_len: u32 BE][value]`.
///
/// Unknown properties are preserved for forward compatibility. Any
/// structural violation is [`ZmtpError::InvalidMetadata`].
pub fn parse_command(payload: &[u8]) -> Result<Command<'_>> {
    let mut i = 0;

    if payload.is_empty() {
        return Err(ZmtpError::InvalidMetadata);
    }

    let name_len = payload[0] as usize;
    i += 1;

    if payload.len() < i + name_len {
        return Err(ZmtpError::InvalidMetadata);
    }
    let name = &payload[i..i + name_len];
    i += name_len;

    let mut props = Vec::new();

    while i < payload.len() {
        let pn_len = payload[i] as usize;
        i += 1;

        if payload.len() < i + pn_len {
            return Err(ZmtpError::InvalidMetadata);
        }
        let pn = &payload[i..i + pn_len];
        i += pn_len;

        if payload.len() < i + 4 {
            return Err(ZmtpError::InvalidMetadata);
        }
        let vl = u32::from_be_bytes([payload[i], payload[i + 1], payload[i + 2], payload[i + 3]])
            as usize;
        i += 4;

        if payload.len() < i + vl {
            return Err(ZmtpError::InvalidMetadata);
        }
        let v = &payload[i..i + vl];
        i += vl;

        props.push(Property { name: pn, value: v });
    }

    Ok(Command { name, props })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::put_property;

    #[test]
    fn bare_name() {
        let cmd = parse_command(b"\x05READY").unwrap();
        assert_eq!(cmd.name, b"READY");
        assert!(cmd.props.is_empty());
    }

    #[test]
    fn name_and_properties() {
        let mut body = b"\x05READY".to_vec();
        put_property(&mut body, "Socket-Type", b"ROUTER");
        put_property(&mut body, "Identity", b"peer-1");

        let cmd = parse_command(&body).unwrap();
        assert_eq!(cmd.name, b"READY");
        assert_eq!(cmd.props.len(), 2);
        assert_eq!(cmd.get(b"Socket-Type"), Some(&b"ROUTER"[..]));
        assert_eq!(cmd.get(b"Identity"), Some(&b"peer-1"[..]));
        assert_eq!(cmd.get(b"Resource"), None);
    }

    #[test]
    fn truncated_inputs_are_invalid() {
        assert_eq!(parse_command(b"").unwrap_err(), ZmtpError::InvalidMetadata);
        // Name length claims more bytes than are present.
        assert_eq!(
            parse_command(b"\x06READY").unwrap_err(),
            ZmtpError::InvalidMetadata
        );
        // Property value length overruns the payload.
        let mut body = b"\x05READY".to_vec();
        body.extend_from_slice(b"\x01X");
        body.extend_from_slice(&10u32.to_be_bytes());
        body.extend_from_slice(b"short");
        assert_eq!(parse_command(&body).unwrap_err(), ZmtpError::InvalidMetadata);
    }
}
