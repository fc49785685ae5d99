// src/utils/html.rs

/// Whitelist-sanitizes text entered by administrators before it is stored.
/// Safe markup such as `<b>` survives; scripts and event handlers are removed.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_and_keeps_plain_text() {
        assert_eq!(clean_html("Hvem vant valget?"), "Hvem vant valget?");
        assert_eq!(clean_html("<b>Ja</b><script>alert(1)</script>"), "<b>Ja</b>");
    }
}
