use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use bip39::{Language, Mnemonic, MnemonicType};
use rand::seq::SliceRandom;
use rand::Rng;

pub const MIN_PASSWORD_LEN: usize = 16;

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
pub const SPECIAL: &[u8] = b"@~-_|:+";

/// Random rpc password of at least `length` characters drawing from every
/// class in each round, then shuffled.
pub fn generate_rpc_password(length: usize) -> String {
    let length = length.max(MIN_PASSWORD_LEN);
    let quarter = (length / 4).max(1);
    let mut rng = rand::thread_rng();
    let mut chars: Vec<u8> = Vec::with_capacity(length + 4 * quarter);
    while chars.len() < length {
        for class in [LOWER, UPPER, DIGITS, SPECIAL] {
            let take = rng.gen_range(1..=quarter.min(class.len()));
            chars.extend(class.choose_multiple(&mut rng, take));
        }
    }
    chars.shuffle(&mut rng);
    chars.into_iter().map(char::from).collect()
}

/// 24 word English mnemonic (256 bits of entropy).
pub fn generate_passphrase() -> String {
    Mnemonic::new(MnemonicType::Words24, Language::English)
        .phrase()
        .to_owned()
}

/// Write `contents` readable by the owner only.
pub fn write_secret_file(path: &Path, contents: &str) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.create(true).write(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents.as_bytes())?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = file.metadata()?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}
