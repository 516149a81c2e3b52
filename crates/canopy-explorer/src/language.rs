use std::path::Path;

pub const PLAINTEXT: &str = "plaintext";

const LANGUAGES: &[(&str, &str)] = &[
    ("bat", "bat"),
    ("c", "c"),
    ("cc", "cpp"),
    ("cpp", "cpp"),
    ("cs", "csharp"),
    ("css", "css"),
    ("dockerfile", "dockerfile"),
    ("go", "go"),
    ("gradle", "groovy"),
    ("groovy", "groovy"),
    ("h", "c"),
    ("hpp", "cpp"),
    ("htm", "html"),
    ("html", "html"),
    ("ini", "ini"),
    ("java", "java"),
    ("js", "javascript"),
    ("json", "json"),
    ("jsx", "javascriptreact"),
    ("kt", "kotlin"),
    ("less", "less"),
    ("lua", "lua"),
    ("md", "markdown"),
    ("php", "php"),
    ("properties", "properties"),
    ("ps1", "powershell"),
    ("py", "python"),
    ("rb", "ruby"),
    ("rs", "rust"),
    ("scss", "scss"),
    ("sh", "shellscript"),
    ("sql", "sql"),
    ("swift", "swift"),
    ("toml", "toml"),
    ("ts", "typescript"),
    ("tsx", "typescriptreact"),
    ("txt", PLAINTEXT),
    ("vue", "vue"),
    ("xml", "xml"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
];

/// Display syntax for a file, derived from its extension.
pub fn language_id(path: &str) -> String {
    let Some(extension) = Path::new(path).extension().and_then(|ext| ext.to_str()) else {
        return PLAINTEXT.to_owned();
    };
    let extension = extension.to_lowercase();
    LANGUAGES
        .iter()
        .find(|(ext, _)| *ext == extension)
        .map(|(_, language)| (*language).to_owned())
        .unwrap_or(extension)
}
