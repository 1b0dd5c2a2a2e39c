//! 提交文件处理
//!
//! 上传的文件先解包到私有临时目录，按作业的忽略规则过滤，再把叶子移动到上传目录，
//! 得到一棵 [`FileTree`](crate::models::files::entities::FileTree) 交给存储层入库。

pub mod archive;
pub mod blackboard;
pub mod blobs;
pub mod ignore;
pub mod multipart;
pub mod tree;

pub use archive::{UploadedFile, process_files};
pub use ignore::{IgnoreFilter, IgnoreHandling};
pub use tree::FileArena;
