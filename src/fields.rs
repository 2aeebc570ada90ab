//! Input masks and the CPF checksum.
//!
//! Masks strip everything but ASCII digits and re-insert separators by
//! position. They never truncate: surplus digits are appended to the last
//! group, the input length limits of the form are what keep them out.

/// Keep only ASCII digits.
pub fn digits(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn digit_count(value: &str) -> usize {
    value.chars().filter(|c| c.is_ascii_digit()).count()
}

/// `###.###.###-##`
pub fn format_cpf(value: &str) -> String {
    let d = digits(value);
    if d.len() < 4 {
        return d;
    }
    if d.len() < 7 {
        return format!("{}.{}", &d[..3], &d[3..]);
    }
    let tail = &d[6..];
    if tail.len() < 4 {
        return format!("{}.{}.{}", &d[..3], &d[3..6], tail);
    }
    // The check digits take the last two positions; a single trailing
    // digit still gets its own group.
    let dash = if tail.len() == 4 { 3 } else { tail.len() - 2 };
    format!(
        "{}.{}.{}-{}",
        &d[..3],
        &d[3..6],
        &tail[..dash],
        &tail[dash..]
    )
}

/// `(##) ####-####` up to 10 digits, `(##) #####-####` beyond.
pub fn format_phone(value: &str) -> String {
    let d = digits(value);
    if d.len() < 6 {
        return d;
    }
    let (area, rest) = d.split_at(2);
    if d.len() <= 10 {
        let (prefix, line) = rest.split_at(4);
        format!("({area}) {prefix}-{line}")
    } else {
        let (prefix, line) = rest.split_at(5);
        format!("({area}) {prefix}-{line}")
    }
}

/// `#####-###`
pub fn format_cep(value: &str) -> String {
    let d = digits(value);
    if d.len() < 5 {
        return d;
    }
    format!("{}-{}", &d[..5], &d[5..])
}

/// `DD/MM/YYYY`
pub fn format_birth(value: &str) -> String {
    let d = digits(value);
    match d.len() {
        0..=2 => d,
        3..=4 => format!("{}/{}", &d[..2], &d[2..]),
        _ => format!("{}/{}/{}", &d[..2], &d[2..4], &d[4..]),
    }
}

/// Birth date as `DD-MM-YYYY` for the CPF lookup, when all 8 digits are present.
pub fn birth_for_lookup(value: &str) -> Option<String> {
    let d = digits(value);
    if d.len() != 8 {
        return None;
    }
    Some(format!("{}-{}-{}", &d[..2], &d[2..4], &d[4..]))
}

/// CPF check-digit validation.
///
/// Requires exactly 11 digits, not all the same, and both check digits
/// matching the mod-11 weighted sums.
pub fn is_valid_cpf(value: &str) -> bool {
    let d: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if d.len() != 11 {
        return false;
    }
    if d.iter().all(|&x| x == d[0]) {
        return false;
    }
    check_digit(&d[..9]) == d[9] && check_digit(&d[..10]) == d[10]
}

fn check_digit(body: &[u32]) -> u32 {
    let top = body.len() as u32 + 1;
    let sum: u32 = body
        .iter()
        .enumerate()
        .map(|(i, &x)| x * (top - i as u32))
        .sum();
    let remainder = (sum * 10) % 11;
    if remainder >= 10 { 0 } else { remainder }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpf_mask_progression() {
        assert_eq!(format_cpf(""), "");
        assert_eq!(format_cpf("123"), "123");
        assert_eq!(format_cpf("1234"), "123.4");
        assert_eq!(format_cpf("1234567"), "123.456.7");
        assert_eq!(format_cpf("123456789"), "123.456.789");
        assert_eq!(format_cpf("1234567890"), "123.456.789-0");
        assert_eq!(format_cpf("12345678901"), "123.456.789-01");
    }

    #[test]
    fn cpf_mask_keeps_surplus_digits() {
        assert_eq!(format_cpf("123456789012"), "123.456.7890-12");
    }

    #[test]
    fn phone_mask_switches_at_eleven_digits() {
        assert_eq!(format_phone("21"), "21");
        assert_eq!(format_phone("213456"), "(21) 3456-");
        assert_eq!(format_phone("2134567890"), "(21) 3456-7890");
        assert_eq!(format_phone("21969400194"), "(21) 96940-0194");
        assert_eq!(format_phone("219694001945"), "(21) 96940-01945");
    }

    #[test]
    fn cep_and_birth_masks() {
        assert_eq!(format_cep("0131"), "0131");
        assert_eq!(format_cep("01310"), "01310-");
        assert_eq!(format_cep("01310100"), "01310-100");
        assert_eq!(format_birth("1"), "1");
        assert_eq!(format_birth("150"), "15/0");
        assert_eq!(format_birth("1503"), "15/03");
        assert_eq!(format_birth("15031990"), "15/03/1990");
    }

    #[test]
    fn masks_strip_non_digits_first() {
        assert_eq!(format_cpf("abc529x982y247z25"), "529.982.247-25");
        assert_eq!(format_cep("01.310-100"), "01310-100");
    }

    #[test]
    fn masks_are_idempotent_on_formatted_input() {
        let cases: [(fn(&str) -> String, &str); 5] = [
            (format_cpf, "529.982.247-25"),
            (format_phone, "(21) 96940-0194"),
            (format_phone, "(21) 3456-7890"),
            (format_cep, "01310-100"),
            (format_birth, "15/03/1990"),
        ];
        for (mask, input) in cases {
            assert_eq!(mask(input), input);
            assert_eq!(mask(&mask(input)), input);
        }
    }

    #[test]
    fn masks_are_total_over_digit_strings() {
        let source = "98765432109876543210";
        for len in 0..=source.len() {
            let input = &source[..len];
            for mask in [format_cpf, format_phone, format_cep, format_birth] {
                let out = mask(input);
                assert_eq!(digits(&out), input);
            }
        }
    }

    #[test]
    fn birth_lookup_needs_full_date() {
        assert_eq!(birth_for_lookup("15/03/1990").as_deref(), Some("15-03-1990"));
        assert_eq!(birth_for_lookup("15/03/199"), None);
        assert_eq!(birth_for_lookup(""), None);
    }

    #[test]
    fn cpf_rejects_repeated_digits() {
        for d in 0..=9 {
            let cpf = d.to_string().repeat(11);
            assert!(!is_valid_cpf(&cpf), "{cpf} should be rejected");
        }
    }

    #[test]
    fn cpf_reference_values() {
        assert!(is_valid_cpf("529.982.247-25"));
        assert!(is_valid_cpf("11144477735"));
        assert!(is_valid_cpf("123.456.789-09"));
        assert!(!is_valid_cpf("529.982.247-24"));
        assert!(!is_valid_cpf("12345678900"));
        assert!(!is_valid_cpf("1234567890"));
        assert!(!is_valid_cpf("123456789090"));
    }
}
