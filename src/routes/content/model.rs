use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
    /// HTML 转义后的搜索词，用于回显
    pub query: String,
    /// 按字面匹配的正则
    pub pattern: String,
}
