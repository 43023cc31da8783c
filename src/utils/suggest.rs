fn normalize_token(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn levenshtein(a: &str, b: &str) -> usize {
    if a == b {
        return 0;
    }
    let n = a.len();
    let m = b.len();
    if n == 0 {
        return m;
    }
    if m == 0 {
        return n;
    }

    let mut prev: Vec<usize> = (0..=m).collect();
    let mut curr = vec![0; m + 1];
    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.chars().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        prev.clone_from_slice(&curr);
    }
    prev[m]
}

fn score(input: &str, candidate: &str) -> usize {
    let a = normalize_token(input);
    let b = normalize_token(candidate);
    if a.is_empty() || b.is_empty() {
        return usize::MAX;
    }
    if a == b {
        return 0;
    }
    if a.contains(&b) || b.contains(&a) {
        return 1;
    }
    levenshtein(&a, &b)
}

fn max_distance(input: &str) -> usize {
    let len = normalize_token(input).len();
    match len {
        0 => 0,
        1..=4 => 1,
        5..=8 => 2,
        _ => ((len as f32) * 0.35).floor().max(3.0) as usize,
    }
}

/// Nearest-name suggestions for unknown tool names, closest first.
pub fn suggest(input: &str, candidates: &[String], limit: usize) -> Vec<String> {
    if input.trim().is_empty() || candidates.is_empty() {
        return Vec::new();
    }
    let allowed = max_distance(input);
    let mut scored: Vec<(String, usize)> = candidates
        .iter()
        .filter_map(|candidate| {
            let s = score(input, candidate);
            (s <= allowed).then(|| (candidate.clone(), s))
        })
        .collect();
    scored.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    scored.truncate(limit.max(1));
    scored.into_iter().map(|(name, _)| name).collect()
}
