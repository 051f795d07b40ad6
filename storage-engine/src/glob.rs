//! Redis-style glob matching: `*`, `?`, `[abc]`, `[a-z]`, `[^x]` and `\` escapes.

pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();

    let (mut pi, mut ti) = (0, 0);
    // Last `*` seen and the text position it is currently absorbing up to
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() {
            if p[pi] == '*' {
                star = Some((pi, ti));
                pi += 1;
                continue;
            }
            let (matched, width) = match_token(&p, pi, t[ti]);
            if matched {
                pi += width;
                ti += 1;
                continue;
            }
        }
        match star {
            Some((sp, st)) => {
                pi = sp + 1;
                ti = st + 1;
                star = Some((sp, st + 1));
            }
            None => return false,
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// Match the single-character token at `pi`; returns whether it matched and
/// how many pattern characters it spans.
fn match_token(p: &[char], pi: usize, c: char) -> (bool, usize) {
    match p[pi] {
        '?' => (true, 1),
        '\\' if pi + 1 < p.len() => (p[pi + 1] == c, 2),
        '[' => match_class(p, pi, c),
        other => (other == c, 1),
    }
}

fn match_class(p: &[char], pi: usize, c: char) -> (bool, usize) {
    let mut i = pi + 1;
    let negate = i < p.len() && p[i] == '^';
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < p.len() && p[i] != ']' {
        if p[i] == '\\' && i + 1 < p.len() {
            matched |= p[i + 1] == c;
            i += 2;
        } else if i + 2 < p.len() && p[i + 1] == '-' && p[i + 2] != ']' {
            let (lo, hi) = if p[i] <= p[i + 2] {
                (p[i], p[i + 2])
            } else {
                (p[i + 2], p[i])
            };
            matched |= lo <= c && c <= hi;
            i += 3;
        } else {
            matched |= p[i] == c;
            i += 1;
        }
    }

    // An unterminated class runs to the end of the pattern
    let width = if i < p.len() { i + 1 - pi } else { i - pi };
    (matched != negate, width)
}
