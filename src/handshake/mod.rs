use crate::{current_timestamp, fill_random_buffer, ByteCursor, ByteWriter, Error, Result, RollingBuffer};

/// RTMP version accepted and emitted in C0/S0
pub const RTMP_VERSION: u8 = 3;

/// Size of the C1/S1/C2/S2 packets
pub const HANDSHAKE_SIZE: usize = 1536;

/// Size of the random block after the two leading time fields
pub const HANDSHAKE_RANDOM_SIZE: usize = HANDSHAKE_SIZE - 8;

/// Server side of the C0/C1/C2 exchange.
///
/// The engine consumes client bytes round by round: round 0 is the version
/// byte, round 1 the C1 time + random block, round 2 the C2 echo. Reaching
/// round 3 means the exchange is byte-complete; [`validate_echo`] then
/// decides whether it was honest. Truncated rounds park the unconsumed
/// suffix in the rolling buffer and resume on the next call.
///
/// [`validate_echo`]: HandshakeEngine::validate_echo
pub struct HandshakeEngine {
    round: u8,

    client_version: u8,
    client_time: u32,
    client_random: [u8; HANDSHAKE_RANDOM_SIZE],

    echo_time: u32,
    echo_time2: u32,
    client_echo: [u8; HANDSHAKE_RANDOM_SIZE],

    server_time: u32,
    server_random: [u8; HANDSHAKE_RANDOM_SIZE],
}

impl HandshakeEngine {
    pub fn new() -> Self {
        Self::with_seed(current_timestamp())
    }

    /// Build an engine whose S1 material derives from the given server time.
    /// The same seed always produces the same S0/S1 bytes.
    pub fn with_seed(server_time: u32) -> Self {
        let mut server_random = [0u8; HANDSHAKE_RANDOM_SIZE];
        fill_random_buffer(&mut server_random, server_time);

        HandshakeEngine {
            round: 0,
            client_version: 0,
            client_time: 0,
            client_random: [0u8; HANDSHAKE_RANDOM_SIZE],
            echo_time: 0,
            echo_time2: 0,
            client_echo: [0u8; HANDSHAKE_RANDOM_SIZE],
            server_time,
            server_random,
        }
    }

    pub fn round(&self) -> u8 {
        self.round
    }

    pub fn is_complete(&self) -> bool {
        self.round >= 3
    }

    pub fn client_version(&self) -> u8 {
        self.client_version
    }

    pub fn client_time(&self) -> u32 {
        self.client_time
    }

    /// The two time fields echoed back in C2
    pub fn echo_times(&self) -> (u32, u32) {
        (self.echo_time, self.echo_time2)
    }

    /// Consume client handshake bytes.
    ///
    /// Incomplete rounds are parked in `rolling`; once round 3 is reached any
    /// trailing bytes are pushed back there for the session parser.
    pub fn consume(&mut self, data: &[u8], rolling: &mut RollingBuffer) -> Result<()> {
        let input = rolling.continue_with(data);
        let mut cursor = ByteCursor::new(&input);

        while !cursor.is_empty() && self.round < 3 {
            let round_start = cursor.position();

            if self.round == 0 {
                let version = cursor.read_u8();
                if version != RTMP_VERSION {
                    return Err(Error::handshake(format!(
                        "unsupported RTMP version {} from client",
                        version
                    )));
                }
                self.client_version = version;
            } else if self.round == 1 {
                let time = cursor.read_u32();
                cursor.read_u32(); // zero field
                let random = cursor.read_data(HANDSHAKE_RANDOM_SIZE);
                if !cursor.is_truncated() {
                    self.client_time = time;
                    self.client_random.copy_from_slice(random);
                }
            } else {
                let time = cursor.read_u32();
                let time2 = cursor.read_u32();
                let echo = cursor.read_data(HANDSHAKE_RANDOM_SIZE);
                if !cursor.is_truncated() {
                    self.echo_time = time;
                    self.echo_time2 = time2;
                    self.client_echo.copy_from_slice(echo);
                }
            }

            if cursor.is_truncated() {
                rolling.store_remaining(&input[round_start..]);
                return Ok(());
            }
            self.round += 1;
        }

        // Handshake complete; hand trailing bytes to the session parser
        if self.round >= 3 && !cursor.is_empty() {
            rolling.store_remaining(cursor.peek_data());
        }
        Ok(())
    }

    /// S0 + S1: version byte, server time, zero field, pseudo-random block
    pub fn s0s1(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(1 + HANDSHAKE_SIZE);
        writer.write_u8(RTMP_VERSION);
        writer.write_u32(self.server_time);
        writer.write_u32(0);
        writer.write_data(&self.server_random);
        writer.into_vec()
    }

    /// S2: peer time, zero field, echo of the client's random block
    pub fn s2(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(HANDSHAKE_SIZE);
        writer.write_u32(self.client_time);
        writer.write_u32(0);
        writer.write_data(&self.client_random);
        writer.into_vec()
    }

    /// Check that C2 echoed the random block the server sent in S1
    pub fn validate_echo(&self) -> Result<()> {
        if self.client_echo != self.server_random {
            return Err(Error::handshake("C2 random echo does not match S1"));
        }
        Ok(())
    }
}

impl Default for HandshakeEngine {
    fn default() -> Self {
        Self::new()
    }
}
