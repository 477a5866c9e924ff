/// Products a marker can carry. The form only offers these, in this order.
pub const FRUITS: &[&str] = &[
    "Abacate",
    "Abacaxi",
    "Açaí",
    "Acerola",
    "Ameixa",
    "Amora",
    "Banana",
    "Banana Nanica",
    "Banana Prata",
    "Caju",
    "Caqui",
    "Carambola",
    "Cereja",
    "Coco",
    "Cupuaçu",
    "Figo",
    "Framboesa",
    "Goiaba",
    "Graviola",
    "Jabuticaba",
    "Jaca",
    "Kiwi",
    "Laranja",
    "Laranja Lima",
    "Limão",
    "Limão Taiti",
    "Maçã",
    "Mamão",
    "Mamão Papaia",
    "Manga",
    "Maracujá",
    "Melancia",
    "Melão",
    "Mexerica",
    "Morango",
    "Nectarina",
    "Pera",
    "Pêssego",
    "Pitanga",
    "Pitaya",
    "Romã",
    "Tamarindo",
    "Tangerina",
    "Uva",
    "Uva Itália",
];

/// Lowercase without the Portuguese diacritics, so that "maca" finds "Maçã".
pub fn fold(s: &str) -> String {
    s.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// An entry matches when the entry itself or one of its words starts with the query.
pub fn matches_prefix(entry: &str, query: &str) -> bool {
    let query = fold(query);
    if query.is_empty() {
        return false;
    }
    let entry = fold(entry);
    entry.starts_with(&query) || entry.split_whitespace().any(|word| word.starts_with(&query))
}

pub fn suggest<'a>(query: &str, selected: &[String], limit: usize) -> Vec<&'a str> {
    let selected: Vec<String> = selected.iter().map(|s| fold(s)).collect();
    FRUITS
        .iter()
        .copied()
        .filter(|fruit| matches_prefix(fruit, query))
        .filter(|fruit| !selected.contains(&fold(fruit)))
        .take(limit)
        .collect()
}
