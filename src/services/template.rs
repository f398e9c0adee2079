//! LaTeX 模板服务 - 业务能力层
//!
//! 模板是普通的 .tex 文件，包含三个占位符：
//! `STUDENT_NAME`、`STUDENT_ID`、`QUESTIONS_SECTION`。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::{debug, warn};

use crate::error::{AppResult, TemplateError};
use crate::models::StudentRecord;
use crate::services::latex_text::escape_all;

pub const NAME_PLACEHOLDER: &str = "STUDENT_NAME";
pub const ID_PLACEHOLDER: &str = "STUDENT_ID";
pub const SECTION_PLACEHOLDER: &str = "QUESTIONS_SECTION";

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"STUDENT_NAME|STUDENT_ID|QUESTIONS_SECTION").expect("PLACEHOLDER")
});

/// 已加载的文档模板
#[derive(Debug, Clone)]
pub struct DocumentTemplate {
    path: PathBuf,
    content: String,
}

impl DocumentTemplate {
    /// 从文件加载模板
    pub fn load(path: &Path) -> AppResult<Self> {
        if !path.is_file() {
            return Err(TemplateError::NotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let content = fs::read_to_string(path).map_err(|source| TemplateError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("模板已加载: {} ({} 字节)", path.display(), content.len());
        Ok(Self::from_string(path, content))
    }

    /// 直接使用字符串作为模板
    pub fn from_string(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        let template = Self {
            path: path.into(),
            content: content.into(),
        };
        if !template.content.contains(SECTION_PLACEHOLDER) {
            warn!(
                "⚠️ 模板 {} 中没有 {} 占位符，生成的文件将不包含题目",
                template.path.display(),
                SECTION_PLACEHOLDER
            );
        }
        template
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 填充模板
    ///
    /// 一次扫描完成替换，替换进去的内容不会被再次匹配。
    pub fn render(&self, student: &StudentRecord, questions_section: &str) -> String {
        let name = escape_all(&student.name);
        let id = escape_all(&student.id);

        PLACEHOLDER
            .replace_all(&self.content, |caps: &Captures<'_>| match &caps[0] {
                NAME_PLACEHOLDER => name.clone(),
                ID_PLACEHOLDER => id.clone(),
                _ => questions_section.to_string(),
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn student(name: &str, id: &str) -> StudentRecord {
        StudentRecord {
            name: name.to_string(),
            id: id.to_string(),
            answers: Vec::new(),
        }
    }

    #[test]
    fn test_render_placeholders() {
        let template = DocumentTemplate::from_string(
            "t.tex",
            "\\title{STUDENT_NAME (STUDENT_ID)}\n\\begin{document}\nQUESTIONS_SECTION\n\\end{document}",
        );
        let out = template.render(&student("Alice", "101"), "BODY");
        assert_eq!(out, "\\title{Alice (101)}\n\\begin{document}\nBODY\n\\end{document}");
    }

    #[test]
    fn test_render_escapes_name_and_id() {
        let template = DocumentTemplate::from_string("t.tex", "STUDENT_NAME/STUDENT_ID");
        let out = template.render(&student("Smith & Sons", "id_7"), "");
        assert_eq!(out, r"Smith \& Sons/id\_7");
    }

    #[test]
    fn test_substituted_text_is_not_rescanned() {
        let template = DocumentTemplate::from_string("t.tex", "QUESTIONS_SECTION STUDENT_ID");
        let out = template.render(&student("A", "9"), "mentions STUDENT_NAME literally");
        assert_eq!(out, "mentions STUDENT_NAME literally 9");
    }

    #[test]
    fn test_load_missing_template() {
        let err = DocumentTemplate::load(Path::new("/no/such/template.tex")).unwrap_err();
        assert!(matches!(
            err,
            crate::error::AppError::Template(TemplateError::NotFound { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "Hello STUDENT_NAME\nQUESTIONS_SECTION").unwrap();

        let template = DocumentTemplate::load(file.path()).unwrap();
        assert_eq!(template.render(&student("Bob", "1"), "Q"), "Hello Bob\nQ");
    }
}
