use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use log::info;

const DEFAULT_POST_REQUEST: &str =
    "Gere um post para a categoria {category_id}, coloque o post em um bloco json no formato \
`{\"title\": \"Título do post\", \"content\": \"HTML do post\", \"tags\": [\"Tag\"], \"author\": 1}`, \
para cada frase gere um texto de 500 caracteres ou mais. Também gere um promt de comando para o Dall-e, \
gerar uma imagem de capa e uma imagem para cada tópico do post, no máximo 5 imagens, coloque todos os prompts \
no mesmo JSON, use o seguinte json, `[{\"title\": \"Titulo da imagem\", \"prompt\": \"Comando para o dall-e gerar a imagem\"}, ...]`, \
mas adicione esse JSON em um bloco shell. Adicione essa tag <img title=\"\" /> em cada tópico e adicione o titulo \
do tópico no atributo title da tag.";

#[derive(Debug)]
pub enum PromptError {
    MissingPlaceholder(String),
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::MissingPlaceholder(key) =>
                write!(f, "Prompt template is missing the '{{{}}}' placeholder", key),
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct PromptConfig {
    pub post_request: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self { post_request: DEFAULT_POST_REQUEST.to_string() }
    }
}

impl PromptConfig {
    fn validate(&self) -> Result<(), PromptError> {
        if !self.post_request.contains("{category_id}") {
            return Err(PromptError::MissingPlaceholder("category_id".to_string()));
        }
        Ok(())
    }

    /// User message asking the model for a post in the given category.
    pub fn post_request(&self, category_id: u64) -> String {
        self.post_request.replace("{category_id}", &category_id.to_string())
    }
}

pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<Arc<PromptConfig>, PromptError> {
    let path = path.as_ref();
    let file_content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("Prompts file '{}' not found, using built-in prompt", path.display());
            return Ok(Arc::new(PromptConfig::default()));
        }
        Err(e) => {
            return Err(e.into());
        }
    };
    let config: PromptConfig = serde_json::from_str(&file_content)?;
    config.validate()?;
    info!("Loaded prompts from: {}", path.display());
    Ok(Arc::new(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_prompt_describes_the_post_fields() {
        let request = PromptConfig::default().post_request(7);
        for field in ["\"title\"", "\"content\"", "\"tags\"", "\"author\"", "\"prompt\""] {
            assert!(request.contains(field), "missing {}", field);
        }
        assert!(request.contains("<img title=\"\" />"));
    }

    #[test]
    fn missing_file_falls_back_to_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_prompts(dir.path().join("absent.json")).unwrap();
        assert_eq!(*config, PromptConfig::default());
        assert!(config.post_request(7).contains("categoria 7"));
    }

    #[test]
    fn file_template_is_substituted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        fs::write(&path, r#"{"post_request": "Write about category {category_id}."}"#).unwrap();

        let config = load_prompts(&path).unwrap();
        assert_eq!(config.post_request(3), "Write about category 3.");
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        fs::write(&path, r#"{"post_request": "Write something."}"#).unwrap();

        assert!(matches!(load_prompts(&path), Err(PromptError::MissingPlaceholder(_))));
    }
}
