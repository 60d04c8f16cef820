/// Canonicalize a scanned bin code.
///
/// Trims, uppercases, turns `-` into `_` and strips spaces. Codes that are
/// all digits, or that start with `TRASHBIN`/`TRASH_BIN`, collapse to the
/// official `TRASH_BIN_NN` form with the numeric suffix zero-padded to two
/// digits. Anything else passes through cleaned but otherwise untouched.
pub fn normalize_bin_code(raw: &str) -> String {
    let code: String = raw.trim().to_uppercase().replace('-', "_").replace(' ', "");

    if !code.is_empty() && code.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = code.parse::<u32>() {
            return format!("TRASH_BIN_{:02}", n);
        }
    }

    if code.starts_with("TRASHBIN") || code.starts_with("TRASH_BIN") {
        let digits: String = code.chars().filter(|c| c.is_ascii_digit()).collect();
        if let Ok(n) = digits.parse::<u32>() {
            return format!("TRASH_BIN_{:02}", n);
        }
    }

    code
}
