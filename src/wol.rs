use std::fmt;
use std::net::UdpSocket;
use std::str::FromStr;

use thiserror::Error;

/// A magic packet starts with six bytes of 0xff so the NIC can spot it
/// anywhere in the frame.
const SYNCHRONIZATION_SCHEME: [u8; 6] = [0xff; 6];
const MAC_REPETITIONS: usize = 16;

pub const MAGIC_PACKET_LEN: usize = 6 + 6 * MAC_REPETITIONS;

#[derive(Debug, Error)]
pub enum WolError {
    #[error("invalid hardware address {0:?}, expected six hex octets like aa:bb:cc:dd:ee:ff")]
    InvalidAddress(String),
    #[error("failed to send magic packet: {0}")]
    Send(#[from] std::io::Error),
}

/// A six-octet hardware (MAC) address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacAddr(pub [u8; 6]);

impl FromStr for MacAddr {
    type Err = WolError;

    /// Accepts `aa:bb:cc:dd:ee:ff` or `AA-BB-CC-DD-EE-FF`; the separator
    /// must be uniform within one address.
    fn from_str(s: &str) -> Result<Self, WolError> {
        let sep = match s.chars().find(|&c| c == ':' || c == '-') {
            Some(c) => c,
            None => return Err(WolError::InvalidAddress(s.to_string())),
        };
        let mut octets = [0u8; 6];
        let mut count = 0;
        for part in s.split(sep) {
            // from_str_radix tolerates a leading sign, so check the chars too
            if part.len() != 2 || !part.chars().all(|c| c.is_ascii_hexdigit()) {
                return Err(WolError::InvalidAddress(s.to_string()));
            }
            if count == 6 {
                return Err(WolError::InvalidAddress(s.to_string()));
            }
            octets[count] = u8::from_str_radix(part, 16)
                .map_err(|_| WolError::InvalidAddress(s.to_string()))?;
            count += 1;
        }
        if count != 6 {
            return Err(WolError::InvalidAddress(s.to_string()));
        }
        Ok(MacAddr(octets))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            a, b, c, d, e, g
        )
    }
}

/// Builds the 102-byte magic packet for `mac`: the synchronization scheme
/// followed by the address repeated sixteen times.
pub fn magic_packet(mac: &MacAddr) -> [u8; MAGIC_PACKET_LEN] {
    let mut data = [0u8; MAGIC_PACKET_LEN];
    data[..6].copy_from_slice(&SYNCHRONIZATION_SCHEME);
    for chunk in data[6..].chunks_exact_mut(6) {
        chunk.copy_from_slice(&mac.0);
    }
    data
}

/// Broadcasts one magic packet for `mac` to 255.255.255.255 on `port`.
///
/// Wake-on-LAN is fire-and-forget: success means the datagram was handed to
/// the socket layer, not that the machine woke. No reply is awaited and
/// nothing is retried.
pub fn wake(mac: &MacAddr, port: u16) -> Result<(), WolError> {
    let data = magic_packet(mac);
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.set_broadcast(true)?;
    socket.send_to(&data, ("255.255.255.255", port))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_colon_separated() {
        let mac: MacAddr = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        assert_eq!(mac.0, [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
    }

    #[test]
    fn parses_hyphens_and_uppercase() {
        let mac: MacAddr = "24-4B-FE-55-78-94".parse().unwrap();
        assert_eq!(mac.0, [0x24, 0x4b, 0xfe, 0x55, 0x78, 0x94]);
    }

    #[test]
    fn rejects_malformed_addresses() {
        for bad in [
            "",
            "aa:bb:cc:dd:ee",
            "aa:bb:cc:dd:ee:ff:00",
            "aa:bb:cc:dd:ee:fg",
            "aabb:cc:dd:ee:ff",
            "aabbccddeeff",
            "+a:bb:cc:dd:ee:ff",
            "aa bb cc dd ee ff",
            "aa:bb-cc:dd:ee:ff",
        ] {
            assert!(
                matches!(bad.parse::<MacAddr>(), Err(WolError::InvalidAddress(_))),
                "{:?} should not parse",
                bad
            );
        }
    }

    #[test]
    fn displays_lowercase_colon_form() {
        let mac: MacAddr = "24-4B-FE-55-78-94".parse().unwrap();
        assert_eq!(mac.to_string(), "24:4b:fe:55:78:94");
    }

    #[test]
    fn magic_packet_layout() {
        let mac: MacAddr = "aa:bb:cc:dd:ee:ff".parse().unwrap();
        let data = magic_packet(&mac);
        assert_eq!(data.len(), 102);
        assert_eq!(&data[..6], &[0xff; 6]);
        for chunk in data[6..].chunks(6) {
            assert_eq!(chunk, &[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        }
    }

    #[test]
    fn magic_packet_concrete_prefix() {
        let mac: MacAddr = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        let data = magic_packet(&mac);
        assert_eq!(
            &data[..18],
            &[
                0xff, 0xff, 0xff, 0xff, 0xff, 0xff, // sync
                0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff, // first repetition
                0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff,
            ]
        );
    }
}
