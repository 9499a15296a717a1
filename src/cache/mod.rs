// 缓存模块
// 桶列表的存储接口及其 Redis / 内存实现

pub mod keys;
pub mod memory;
pub mod redis_store;
pub mod store;

// 重新导出常用类型，方便其他模块使用
pub use memory::MemoryBucketStore;
pub use redis_store::RedisBucketStore;
pub use store::{BucketCommand, BucketStore, StoreError, StoreResult};
