/// Utilitários de texto para os campos da base legada

/// Mantém apenas os dígitos (CPF, CNPJ, CEP)
pub fn only_digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Trunca em `max_chars` caracteres (não bytes)
///
/// # Exemplo
/// ```
/// use odontogroup_middleware::utils::string_utils::truncate_chars;
///
/// assert_eq!(truncate_chars("JOSÉ DA SILVA", 4), "JOSÉ");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// `Option<String>` vazia ou só com espaços vira `None`
pub fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_digits() {
        assert_eq!(only_digits("12.345.678/0001-99"), "12345678000199");
        assert_eq!(only_digits("abc"), "");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        let nome = "Ç".repeat(80);
        assert_eq!(truncate_chars(&nome, 70).chars().count(), 70);
        assert_eq!(truncate_chars("ANA", 70), "ANA");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(Some("  ".to_string())), None);
        assert_eq!(non_empty(Some(" 12 ".to_string())).as_deref(), Some("12"));
        assert_eq!(non_empty(None), None);
    }
}
