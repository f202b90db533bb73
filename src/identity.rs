use std::fs;
use std::path::Path;

use rand::Rng;

use crate::error::Error;

const TOKEN_PREFIX: &str = "ID_";
const TOKEN_LEN: usize = 6;
const TOKEN_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

// a locally persisted stand-in for authenticated identity: the same token is
// used uninterpreted as client_id and truck_id, and collisions between
// sessions are possible but unhandled
#[derive(Clone, Debug)]
pub struct SessionIdentity {
    token: String,
}

impl SessionIdentity {
    pub fn load_or_generate(path: &Path) -> Result<Self, Error> {
        if let Ok(saved) = fs::read_to_string(path) {
            let token = saved.trim();

            if !token.is_empty() {
                return Ok(Self {
                    token: token.into(),
                });
            }
        }

        let token = generate_token();
        fs::write(path, &token)?;

        Ok(Self { token })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    #[cfg(test)]
    pub(crate) fn fixed(token: &str) -> Self {
        Self {
            token: token.into(),
        }
    }
}

fn generate_token() -> String {
    let mut rng = rand::thread_rng();

    let suffix: String = (0..TOKEN_LEN)
        .map(|_| TOKEN_CHARSET[rng.gen_range(0..TOKEN_CHARSET.len())] as char)
        .collect();

    format!("{}{}", TOKEN_PREFIX, suffix)
}
