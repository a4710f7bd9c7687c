//! Replica name policy.

use std::collections::HashSet;

use rand::Rng;

const NAME_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const NAME_SUFFIX_LEN: usize = 4;

/// Synthesize a name `{prefix}XXXX` not present in `taken`.
pub fn synthesize_name<R: Rng + ?Sized>(rng: &mut R, prefix: &str, taken: &HashSet<String>) -> String {
    loop {
        let suffix: String = (0..NAME_SUFFIX_LEN)
            .map(|_| NAME_CHARSET[rng.gen_range(0..NAME_CHARSET.len())] as char)
            .collect();
        let name = format!("{}{}", prefix, suffix);
        if !taken.contains(&name) {
            return name;
        }
    }
}

/// Names become container names, command arguments and URL hosts, so they
/// follow the docker container-name grammar `[a-zA-Z0-9][a-zA-Z0-9_.-]*`.
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_synthesized_names_have_prefix_and_suffix() {
        let mut rng = StdRng::seed_from_u64(7);
        let name = synthesize_name(&mut rng, "S", &HashSet::new());
        assert_eq!(name.len(), 5);
        assert!(name.starts_with('S'));
        assert!(name[1..].bytes().all(|b| NAME_CHARSET.contains(&b)));
    }

    #[test]
    fn test_synthesized_names_avoid_taken() {
        let mut rng = StdRng::seed_from_u64(1);
        let first = synthesize_name(&mut rng, "S", &HashSet::new());

        // Same seed would produce `first` again; it must be skipped.
        let mut rng = StdRng::seed_from_u64(1);
        let taken: HashSet<String> = [first.clone()].into_iter().collect();
        assert_ne!(synthesize_name(&mut rng, "S", &taken), first);
    }

    #[test]
    fn test_name_validation() {
        assert!(is_valid_name("S1"));
        assert!(is_valid_name("replica-a"));
        assert!(is_valid_name("web_1.internal"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("two words"));
        assert!(!is_valid_name("a/b"));
    }

    #[test]
    fn test_rejects_authority_and_flag_syntax() {
        assert!(!is_valid_name("x@169.254.169.254"));
        assert!(!is_valid_name("host:8080"));
        assert!(!is_valid_name("-d"));
        assert!(!is_valid_name("--network=host"));
        assert!(!is_valid_name(".hidden"));
        assert!(!is_valid_name("srv\u{e9}"));
    }
}
