use std::convert::TryInto;
use std::path::PathBuf;
use std::{env, fs};

const PASSWORD_SALT: &str = "password.salt";

pub type Salt = [u8; 16];

/// Server-side secrets that live outside the configuration file.
///
/// Currently only the bcrypt password salt; the JWT secret comes from
/// [`crate::config::Config`] because deployments supply it via environment.
#[derive(Debug, Clone)]
pub struct Security {
    pub salt: Salt,
}

#[inline]
fn security_dir() -> PathBuf {
    PathBuf::from(env::var("SECURITY_DIR").unwrap_or("./security".to_string()))
}

impl Security {
    pub fn load() -> Security {
        let dir = security_dir();

        fs::create_dir_all(dir.clone())
            .expect("unable to create directory for storing security information");

        tracing::info!("Loading password salt...");
        let mut salt: Option<Salt> = fs::read(dir.join(PASSWORD_SALT))
            .map(|s| s.try_into().ok())
            .ok()
            .flatten();

        match salt {
            None => {
                tracing::info!(
                    "Salt not found in '{}'. Generating a new password salt.",
                    dir.join(PASSWORD_SALT).display()
                );
                salt = Some(rand::random());

                fs::write(dir.join(PASSWORD_SALT), salt.unwrap()).expect("unable to write salt");
            }
            Some(_) => tracing::info!("Salt found and loaded."),
        }

        Security {
            salt: salt.unwrap(),
        }
    }
}
