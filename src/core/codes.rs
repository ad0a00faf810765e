//! Static code-to-label tables for coded directory fields.

/// Institution control (CONTROL).
pub fn control_label(code: i64) -> Option<&'static str> {
    match code {
        1 => Some("Public"),
        2 => Some("Private nonprofit"),
        3 => Some("Private for-profit"),
        _ => None,
    }
}

/// Institutional level (ICLEVEL).
pub fn level_label(code: i64) -> Option<&'static str> {
    match code {
        1 => Some("Four or more years"),
        2 => Some("At least 2 but less than 4 years"),
        3 => Some("Less than 2 years"),
        -1 | -2 => Some("Not applicable"),
        _ => None,
    }
}

/// Institution size band (INSTSIZE).
pub fn size_label(code: i64) -> Option<&'static str> {
    match code {
        1 => Some("Very small (under 1,000)"),
        2 => Some("Small (1,000-2,999)"),
        3 => Some("Medium (3,000-9,999)"),
        4 => Some("Large (10,000-19,999)"),
        5 => Some("Very large (20,000 and above)"),
        -1 => Some("Not reported"),
        -2 => Some("Not applicable"),
        _ => None,
    }
}

/// Carnegie basic classification (CCBASIC).
pub fn carnegie_label(code: i64) -> Option<&'static str> {
    let label = match code {
        15 => "Doctoral Universities: Very High Research Activity",
        16 => "Doctoral Universities: High Research Activity",
        17 => "Doctoral/Professional Universities",
        18 => "Master's Colleges & Universities: Larger Programs",
        19 => "Master's Colleges & Universities: Medium Programs",
        20 => "Master's Colleges & Universities: Small Programs",
        21 => "Baccalaureate Colleges: Arts & Sciences Focus",
        22 => "Baccalaureate Colleges: Diverse Fields",
        23 => "Baccalaureate/Associate's Colleges",
        24 => "Associate's Colleges: High Transfer-High Traditional",
        25 => "Associate's Colleges: High Transfer-Mixed Traditional/Nontraditional",
        26 => "Associate's Colleges: High Transfer-High Nontraditional",
        27 => "Associate's Colleges: Mixed Transfer/Career & Technical-High Traditional",
        28 => "Associate's Colleges: Mixed Transfer/Career & Technical-Mixed Traditional/Nontraditional",
        29 => "Associate's Colleges: Mixed Transfer/Career & Technical-High Nontraditional",
        30 => "Associate's Colleges: High Career & Technical-High Traditional",
        31 => "Associate's Colleges: High Career & Technical-Mixed Traditional/Nontraditional",
        32 => "Associate's Colleges: High Career & Technical-High Nontraditional",
        33 => "Special Focus Two-Year: Health Professions & Other Fields",
        34 => "Special Focus Two-Year: Technical Professions",
        35 => "Special Focus Four-Year: Faith-Related Institutions",
        36 => "Special Focus Four-Year: Medical Schools & Medical Centers",
        37 => "Special Focus Four-Year: Other Health Professions Schools",
        38 => "Special Focus Four-Year: Engineering Schools",
        39 => "Special Focus Four-Year: Other Technology-Related Schools",
        40 => "Special Focus Four-Year: Business & Management Schools",
        41 => "Special Focus Four-Year: Arts, Music & Design Schools",
        42 => "Special Focus Four-Year: Law Schools",
        43 => "Special Focus Four-Year: Other Special Focus Institutions",
        -1 | -2 => "Not classified",
        _ => return None,
    };
    Some(label)
}
