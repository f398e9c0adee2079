//! LaTeX 编译器 - 基础设施层
//!
//! 持有外部编译器（默认 pdflatex）的调用方式，只暴露"编译一个 .tex"的能力

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppResult, CompileError};

/// 编译成功后清理的辅助文件
const AUX_EXTENSIONS: &[&str] = &["aux", "log", "out"];

/// 失败时保留的输出行数
const DETAIL_LINES: usize = 12;

/// LaTeX 编译器
///
/// 职责：
/// - 调用外部编译器，限制每一遍的运行时间
/// - 通过 PDF 是否生成来判断成败
/// - 不认识学生 / 题目
#[derive(Debug, Clone)]
pub struct LatexCompiler {
    program: String,
    passes: u32,
    timeout: Duration,
    output_dir: PathBuf,
    clean_aux: bool,
}

impl LatexCompiler {
    pub fn new(
        program: impl Into<String>,
        passes: u32,
        timeout: Duration,
        output_dir: impl Into<PathBuf>,
        clean_aux: bool,
    ) -> Self {
        Self {
            program: program.into(),
            passes: passes.max(1),
            timeout,
            output_dir: output_dir.into(),
            clean_aux,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.compiler.clone(),
            config.compile_passes,
            Duration::from_secs(config.compile_timeout_secs),
            config.output_dir.clone(),
            config.clean_aux,
        )
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// 检查编译器是否可用
    ///
    /// # 返回
    /// 版本信息的第一行
    pub async fn probe(&self) -> Result<String, CompileError> {
        let mut cmd = Command::new(&self.program);
        cmd.arg("--version");

        let output = self.run(cmd, Path::new(&self.program)).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    /// 编译 .tex 文件
    ///
    /// # 参数
    /// - `tex_path`: 要编译的 .tex 文件
    ///
    /// # 返回
    /// 生成的 PDF 路径
    pub async fn compile(&self, tex_path: &Path) -> AppResult<PathBuf> {
        let pdf_path = self.artifact(tex_path, "pdf");

        // 旧的 PDF 会让失败的编译看起来成功
        if pdf_path.exists() {
            tokio::fs::remove_file(&pdf_path)
                .await
                .map_err(|source| CompileError::StalePdf {
                    path: pdf_path.clone(),
                    source,
                })?;
        }

        let mut output = self.run_pass(tex_path, 1).await?;
        for pass in 2..=self.passes {
            output = self.run_pass(tex_path, pass).await?;
        }

        if !pdf_path.exists() {
            return Err(CompileError::Failed {
                path: tex_path.to_path_buf(),
                status: output.status.to_string(),
                detail: tail_output(&output),
            }
            .into());
        }

        if !output.status.success() {
            warn!(
                "⚠️ {} 返回 {}，但已生成 PDF: {}",
                self.program,
                output.status,
                pdf_path.display()
            );
        }

        if self.clean_aux {
            self.clean(tex_path).await;
        }

        info!("✓ 已编译 PDF: {}", pdf_path.display());
        Ok(pdf_path)
    }

    async fn run_pass(&self, tex_path: &Path, pass: u32) -> Result<Output, CompileError> {
        debug!("编译 {} (第 {}/{} 遍)", tex_path.display(), pass, self.passes);

        let mut cmd = Command::new(&self.program);
        cmd.arg("-interaction=nonstopmode")
            .arg("-output-directory")
            .arg(&self.output_dir)
            .arg(tex_path);

        self.run(cmd, tex_path).await
    }

    /// 运行一次编译器，超时后杀掉进程
    async fn run(&self, mut cmd: Command, subject: &Path) -> Result<Output, CompileError> {
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|e| self.spawn_error(e))?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(self.spawn_error(e)),
            Err(_) => Err(CompileError::Timeout {
                path: subject.to_path_buf(),
                secs: self.timeout.as_secs(),
            }),
        }
    }

    fn spawn_error(&self, err: std::io::Error) -> CompileError {
        if err.kind() == ErrorKind::NotFound {
            CompileError::ProgramNotFound {
                program: self.program.clone(),
            }
        } else {
            CompileError::SpawnFailed {
                program: self.program.clone(),
                source: err,
            }
        }
    }

    /// 编译产物路径：输出目录下与 .tex 同名的文件
    fn artifact(&self, tex_path: &Path, extension: &str) -> PathBuf {
        // 姓名里可能有 "."，不能用 with_extension
        let stem = tex_path.file_stem().unwrap_or_default().to_string_lossy();
        self.output_dir.join(format!("{stem}.{extension}"))
    }

    async fn clean(&self, tex_path: &Path) {
        for ext in AUX_EXTENSIONS {
            let aux = self.artifact(tex_path, ext);
            if aux.exists() {
                if let Err(e) = tokio::fs::remove_file(&aux).await {
                    debug!("删除 {} 失败: {}", aux.display(), e);
                }
            }
        }
    }
}

/// 编译器输出的最后几行（pdflatex 的错误写在 stdout）
fn tail_output(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let lines: Vec<&str> = stdout
        .lines()
        .chain(stderr.lines())
        .filter(|l| !l.trim().is_empty())
        .collect();

    let start = lines.len().saturating_sub(DETAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_missing_program() {
        let dir = tempdir().unwrap();
        let compiler = LatexCompiler::new(
            "definitely-not-a-latex-compiler",
            2,
            Duration::from_secs(5),
            dir.path(),
            true,
        );

        let err = compiler.probe().await.unwrap_err();
        assert!(matches!(err, CompileError::ProgramNotFound { .. }));

        let tex = dir.path().join("a.tex");
        std::fs::write(&tex, "x").unwrap();
        let err = compiler.compile(&tex).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Compile(CompileError::ProgramNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_stale_pdf_that_cannot_be_removed() {
        let dir = tempdir().unwrap();
        let compiler = LatexCompiler::new(
            "definitely-not-a-latex-compiler",
            1,
            Duration::from_secs(5),
            dir.path(),
            true,
        );

        let tex = dir.path().join("a.tex");
        std::fs::write(&tex, "x").unwrap();
        // 目录无法用 remove_file 删除
        std::fs::create_dir(dir.path().join("a.pdf")).unwrap();

        let err = compiler.compile(&tex).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Compile(CompileError::StalePdf { .. })
        ));
    }

    #[test]
    fn test_artifact_path() {
        let compiler = LatexCompiler::new("pdflatex", 2, Duration::from_secs(1), "/out", true);
        assert_eq!(
            compiler.artifact(Path::new("/out/Alice Smith.tex"), "pdf"),
            PathBuf::from("/out/Alice Smith.pdf")
        );
        assert_eq!(
            compiler.artifact(Path::new("/out/J. R. Doe.tex"), "aux"),
            PathBuf::from("/out/J. R. Doe.aux")
        );
    }

    #[test]
    fn test_passes_at_least_one() {
        let compiler = LatexCompiler::new("pdflatex", 0, Duration::from_secs(1), "/out", true);
        assert_eq!(compiler.passes, 1);
    }

    #[cfg(unix)]
    mod fake_compiler {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        /// 写一个假的编译器脚本
        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-latex");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        const SUCCEEDS: &str = r#"
if [ "$1" = "--version" ]; then echo "fake-latex 1.0"; exit 0; fi
dir="$3"
base=$(basename "$4" .tex)
echo "pass" >> "$dir/passes"
echo "%PDF" > "$dir/$base.pdf"
echo "aux" > "$dir/$base.aux"
echo "log" > "$dir/$base.log"
"#;

        #[tokio::test]
        async fn test_compile_success_cleans_aux() {
            let bin = tempdir().unwrap();
            let out = tempdir().unwrap();
            let program = script(bin.path(), SUCCEEDS);
            let compiler = LatexCompiler::new(
                program.to_string_lossy(),
                2,
                Duration::from_secs(10),
                out.path(),
                true,
            );

            assert_eq!(compiler.probe().await.unwrap(), "fake-latex 1.0");

            let tex = out.path().join("Alice.tex");
            std::fs::write(&tex, "x").unwrap();
            let pdf = compiler.compile(&tex).await.unwrap();

            assert_eq!(pdf, out.path().join("Alice.pdf"));
            assert!(pdf.exists());
            assert!(!out.path().join("Alice.aux").exists());
            assert!(!out.path().join("Alice.log").exists());
            // 默认编译两遍
            let passes = std::fs::read_to_string(out.path().join("passes")).unwrap();
            assert_eq!(passes.lines().count(), 2);
        }

        #[tokio::test]
        async fn test_compile_failure_reports_output() {
            let bin = tempdir().unwrap();
            let out = tempdir().unwrap();
            let program = script(bin.path(), "echo '! Undefined control sequence.'\nexit 1");
            let compiler =
                LatexCompiler::new(program.to_string_lossy(), 1, Duration::from_secs(10), out.path(), true);

            let tex = out.path().join("Bob.tex");
            std::fs::write(&tex, "x").unwrap();
            // 上一次运行留下的 PDF 不算
            std::fs::write(out.path().join("Bob.pdf"), "old").unwrap();

            match compiler.compile(&tex).await {
                Err(AppError::Compile(CompileError::Failed { detail, .. })) => {
                    assert!(detail.contains("Undefined control sequence"));
                }
                other => panic!("意外的结果: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_nonzero_exit_with_pdf_is_success() {
            let bin = tempdir().unwrap();
            let out = tempdir().unwrap();
            let program = script(
                bin.path(),
                "base=$(basename \"$4\" .tex)\necho \"%PDF\" > \"$3/$base.pdf\"\necho '! Overfull warning'\nexit 1",
            );
            let compiler =
                LatexCompiler::new(program.to_string_lossy(), 1, Duration::from_secs(10), out.path(), true);

            let tex = out.path().join("Dave.tex");
            std::fs::write(&tex, "x").unwrap();

            let pdf = compiler.compile(&tex).await.unwrap();
            assert_eq!(pdf, out.path().join("Dave.pdf"));
            assert!(pdf.exists());
        }

        #[tokio::test]
        async fn test_compile_timeout() {
            let bin = tempdir().unwrap();
            let out = tempdir().unwrap();
            let program = script(bin.path(), "sleep 5");
            let compiler =
                LatexCompiler::new(program.to_string_lossy(), 1, Duration::from_secs(1), out.path(), true);

            let tex = out.path().join("Carol.tex");
            std::fs::write(&tex, "x").unwrap();

            let err = compiler.compile(&tex).await.unwrap_err();
            assert!(matches!(
                err,
                AppError::Compile(CompileError::Timeout { secs: 1, .. })
            ));
        }
    }
}
