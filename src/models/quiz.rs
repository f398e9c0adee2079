use csv::StringRecord;

/// 作答题型：问答题
pub const ESSAY_ITEM_TYPE: &str = "essay";
/// 批改状态：已批改
pub const GRADED_STATUS: &str = "Graded";

/// 一道题在 CSV 中占用的五列
///
/// `ItemID`, `ItemType`, `<题干>`, `EarnedPoints`, `Status`
/// 题干列的表头是题目文本，单元格是学生的答案。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionColumns {
    pub item_id: usize,
    pub item_type: usize,
    pub answer: usize,
    pub earned_points: usize,
    pub status: usize,
    /// 题干（来自表头）
    pub prompt: String,
}

/// 某个学生某道题的一组数据
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionBlock {
    pub item_id: String,
    pub item_type: String,
    pub prompt: String,
    pub answer: String,
    pub earned_points: Option<f64>,
    pub status: String,
}

impl QuestionBlock {
    /// 已批改的问答题且答案非空
    pub fn is_graded_essay(&self) -> bool {
        self.item_type == ESSAY_ITEM_TYPE
            && self.status == GRADED_STATUS
            && !self.answer.trim().is_empty()
    }
}

/// 一道需要输出的问答题
#[derive(Debug, Clone, PartialEq)]
pub struct EssayAnswer {
    pub item_id: String,
    pub prompt: String,
    pub answer: String,
    pub earned_points: Option<f64>,
}

impl From<QuestionBlock> for EssayAnswer {
    fn from(block: QuestionBlock) -> Self {
        Self {
            item_id: block.item_id,
            prompt: block.prompt,
            answer: block.answer,
            earned_points: block.earned_points,
        }
    }
}

/// 学生及其已批改的问答题
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub name: String,
    pub id: String,
    pub answers: Vec<EssayAnswer>,
}

/// 解析后的 Canvas 测验导出
#[derive(Debug, Clone)]
pub struct QuizExport {
    pub(crate) headers: Vec<String>,
    pub(crate) questions: Vec<QuestionColumns>,
    pub(crate) name_col: usize,
    pub(crate) id_col: usize,
    pub(crate) rows: Vec<StringRecord>,
}

impl QuizExport {
    /// 表头
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// 识别出的题目列
    pub fn questions(&self) -> &[QuestionColumns] {
        &self.questions
    }

    /// 数据行数
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 某一行的姓名和学号
    pub fn identity(&self, row: usize) -> Option<(&str, &str)> {
        let record = self.rows.get(row)?;
        Some((
            record.get(self.name_col).unwrap_or_default(),
            record.get(self.id_col).unwrap_or_default(),
        ))
    }

    /// 某一行的全部题目数据，按列顺序
    pub fn blocks(&self, row: usize) -> Vec<QuestionBlock> {
        let Some(record) = self.rows.get(row) else {
            return Vec::new();
        };
        let cell = |idx: usize| record.get(idx).unwrap_or_default().to_string();

        self.questions
            .iter()
            .map(|q| QuestionBlock {
                item_id: cell(q.item_id),
                item_type: cell(q.item_type),
                prompt: q.prompt.clone(),
                answer: cell(q.answer),
                earned_points: record
                    .get(q.earned_points)
                    .and_then(|v| v.trim().parse().ok()),
                status: cell(q.status),
            })
            .collect()
    }

    /// 提取作答了已批改问答题的学生
    ///
    /// `limit` 限制的是读取的行数（在过滤之前），0 表示不限制。没有任何问答题的学生会被跳过。
    pub fn students(&self, limit: Option<usize>) -> Vec<StudentRecord> {
        let rows = match limit {
            Some(n) if n > 0 => n.min(self.rows.len()),
            _ => self.rows.len(),
        };

        (0..rows)
            .filter_map(|row| {
                let (name, id) = self.identity(row)?;
                let answers: Vec<EssayAnswer> = self
                    .blocks(row)
                    .into_iter()
                    .filter(QuestionBlock::is_graded_essay)
                    .map(EssayAnswer::from)
                    .collect();

                if answers.is_empty() {
                    return None;
                }

                Some(StudentRecord {
                    name: name.to_string(),
                    id: id.to_string(),
                    answers,
                })
            })
            .collect()
    }
}
