//! Cheap input screening so obvious junk never costs an AI call.

const MIN_LEN: usize = 2;
const MAX_LEN: usize = 80;
/// Whole input is a single letter repeated at least this many times.
const MIN_REPEAT_RUN: usize = 4;
/// Letters-only inputs at least this long, typed along one keyboard row.
const MIN_ROW_MASH: usize = 5;
/// Vowel-ratio check only applies from this many letters (keeps SQL, C++, AWS).
const MIN_LETTERS_FOR_RATIO: usize = 5;
const MIN_VOWEL_RATIO: f64 = 0.15;
const MAX_VOWEL_RATIO: f64 = 0.85;

const KEYBOARD_ROWS: &[&str] = &["qwertyuiop", "asdfghjkl", "zxcvbnm"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkillRejection {
    Length,
    Gibberish,
}

impl SkillRejection {
    pub fn message(&self) -> &'static str {
        match self {
            SkillRejection::Length => "Skill must be 2-80 characters.",
            SkillRejection::Gibberish => {
                "That doesn't look like a real skill. Try 'Python', 'Docker', 'React', etc."
            }
        }
    }
}

/// Trims and screens a requested skill. Returns the cleaned value.
pub fn validate_skill(raw: &str) -> Result<&str, SkillRejection> {
    let skill = raw.trim();
    let len = skill.chars().count();
    if !(MIN_LEN..=MAX_LEN).contains(&len) {
        return Err(SkillRejection::Length);
    }

    if is_repeated_letter(skill) || is_keyboard_mash(skill) || has_weird_vowel_ratio(skill) {
        return Err(SkillRejection::Gibberish);
    }

    Ok(skill)
}

fn is_repeated_letter(skill: &str) -> bool {
    let mut chars = skill.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    first.is_ascii_alphabetic()
        && skill.chars().count() >= MIN_REPEAT_RUN
        && chars.all(|c| c == first)
}

fn is_keyboard_mash(skill: &str) -> bool {
    let lower = skill.to_ascii_lowercase();
    lower.len() >= MIN_ROW_MASH
        && lower.chars().all(|c| c.is_ascii_lowercase())
        && KEYBOARD_ROWS
            .iter()
            .any(|row| lower.chars().all(|c| row.contains(c)))
}

fn has_weird_vowel_ratio(skill: &str) -> bool {
    let letters: Vec<char> = skill
        .chars()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if letters.len() < MIN_LETTERS_FOR_RATIO {
        return false;
    }
    let vowels = letters.iter().filter(|c| "aeiou".contains(**c)).count();
    let ratio = vowels as f64 / letters.len() as f64;
    !(MIN_VOWEL_RATIO..=MAX_VOWEL_RATIO).contains(&ratio)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_skills_pass() {
        for skill in [
            "Python",
            "Docker",
            "React",
            "System Design",
            "Kubernetes",
            "Go",
            "SQL",
            "C++",
            "AWS",
            "Machine Learning",
            "rust",
        ] {
            assert_eq!(validate_skill(skill), Ok(skill), "{skill} should pass");
        }
    }

    #[test]
    fn test_input_is_trimmed() {
        assert_eq!(validate_skill("  Terraform \n"), Ok("Terraform"));
    }

    #[test]
    fn test_length_bounds() {
        assert_eq!(validate_skill("a"), Err(SkillRejection::Length));
        assert_eq!(validate_skill("   "), Err(SkillRejection::Length));
        assert_eq!(validate_skill(&"x".repeat(81)), Err(SkillRejection::Length));
        assert!(validate_skill(&"Data ".repeat(16)).is_ok());
    }

    #[test]
    fn test_repeated_letters_rejected() {
        assert_eq!(validate_skill("aaaa"), Err(SkillRejection::Gibberish));
        assert_eq!(validate_skill("BBBBBB"), Err(SkillRejection::Gibberish));
        // three is below the run threshold
        assert!(!is_repeated_letter("aaa"));
    }

    #[test]
    fn test_keyboard_row_mashing_rejected() {
        assert_eq!(validate_skill("asdfgh"), Err(SkillRejection::Gibberish));
        assert_eq!(validate_skill("qwerty"), Err(SkillRejection::Gibberish));
        assert_eq!(validate_skill("zxcvb"), Err(SkillRejection::Gibberish));
    }

    #[test]
    fn test_consonant_soup_rejected() {
        assert_eq!(validate_skill("gfnhgnrh"), Err(SkillRejection::Gibberish));
        assert_eq!(validate_skill("xkcdzzpt"), Err(SkillRejection::Gibberish));
    }

    #[test]
    fn test_vowel_soup_rejected() {
        assert_eq!(validate_skill("aeiouaeio"), Err(SkillRejection::Gibberish));
    }
}
