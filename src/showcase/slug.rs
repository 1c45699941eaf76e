use regex::Regex;

lazy_static::lazy_static! {
    static ref NON_SLUG_RUN: Regex = Regex::new(r"[^a-z0-9]+").unwrap();
}

fn transliterate_char(c: char) -> Option<&'static str> {
    let latin = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "yo",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "j",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "c",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' => "",
        'ы' => "y",
        'ь' => "",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        _ => return None,
    };
    Some(latin)
}

/// Адрес витрины из её названия: транслитерация кириллицы, нижний регистр,
/// любые прочие символы схлопываются в один дефис, дефисы по краям убираются.
pub fn derive_slug(name: &str) -> String {
    let mut latin = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        match transliterate_char(c) {
            Some(mapped) => latin.push_str(mapped),
            None => latin.push(c),
        }
    }
    NON_SLUG_RUN
        .replace_all(&latin, "-")
        .trim_matches('-')
        .to_string()
}

/// Приводит введённый вручную адрес к набору `[a-z0-9-]`, отбрасывая прочие символы.
pub fn clean_slug(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}
