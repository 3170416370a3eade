use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// 默认的类名
pub const IMAGE_CLASS: &str = "Image";
/// 同时使用图片与文本生成向量的模块
pub const MULTI2VEC_CLIP: &str = "multi2vec-clip";

/// 属性的数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Blob,
    Text,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,
    pub data_type: Vec<DataType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// 向量化模块使用的字段
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleFields {
    #[serde(default)]
    pub image_fields: Vec<String>,
    #[serde(default)]
    pub text_fields: Vec<String>,
}

/// 向量数据库中的类定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSchema {
    pub class: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub vectorizer: String,
    #[serde(default)]
    pub module_config: HashMap<String, ModuleFields>,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl ClassSchema {
    /// 商品图片类：`image` 为 blob，`title` 为文本，两者共同生成一个向量
    pub fn image_class(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            description: Some("A class to store image data with vector embeddings".to_owned()),
            vectorizer: MULTI2VEC_CLIP.to_owned(),
            module_config: HashMap::from([(
                MULTI2VEC_CLIP.to_owned(),
                ModuleFields {
                    image_fields: vec!["image".to_owned()],
                    text_fields: vec!["title".to_owned()],
                },
            )]),
            properties: vec![
                Property {
                    name: "image".to_owned(),
                    data_type: vec![DataType::Blob],
                    description: Some("The image file".to_owned()),
                },
                Property {
                    name: "title".to_owned(),
                    data_type: vec![DataType::Text],
                    description: Some("Title of the product".to_owned()),
                },
            ],
        }
    }

    /// 检查已存在的类定义能否满足当前定义
    ///
    /// 返回第一处不兼容的描述，兼容时返回 `None`。
    /// 描述文字与额外属性不影响兼容性。
    pub fn incompatibility(&self, existing: &ClassSchema) -> Option<String> {
        if self.class != existing.class {
            return Some(format!("类名不一致: {} != {}", existing.class, self.class));
        }
        if self.vectorizer != existing.vectorizer {
            return Some(format!(
                "向量化模块不一致: {} != {}",
                existing.vectorizer, self.vectorizer
            ));
        }
        if let Some(wanted) = self.module_config.get(&self.vectorizer) {
            let found = existing
                .module_config
                .get(&existing.vectorizer)
                .cloned()
                .unwrap_or_default();
            let as_set = |v: &[String]| v.iter().cloned().collect::<BTreeSet<_>>();
            if as_set(&wanted.image_fields) != as_set(&found.image_fields)
                || as_set(&wanted.text_fields) != as_set(&found.text_fields)
            {
                return Some(format!("向量化字段不一致: {found:?} != {wanted:?}"));
            }
        }
        for prop in &self.properties {
            let same_name = |p: &&Property| p.name.eq_ignore_ascii_case(&prop.name);
            match existing.properties.iter().find(same_name) {
                None => return Some(format!("缺少属性 {}", prop.name)),
                Some(p) if p.data_type != prop.data_type => {
                    return Some(format!(
                        "属性 {} 类型不一致: {:?} != {:?}",
                        prop.name, p.data_type, prop.data_type
                    ));
                }
                Some(_) => {}
            }
        }
        None
    }
}
