#![cfg(test)]

use crate::{headless_device, TEST_CONFIG};
use binding_model_core::config::DescriptorHeapSizes;
use binding_model_core::descriptor::{
	DeclarationError, ResourceDescriptor, ResourceKind, ShaderStages, SignatureDesc, Variability,
};
use binding_model_core::device::BindingDevice;
use binding_model_core::platform::headless::{Headless, HeadlessError};
use binding_model_core::set_cache::{SetCacheError, SetCacheStats};
use binding_model_core::signature::ResourceSignature;
use std::sync::{Arc, Barrier};
use std::thread;

fn signature(
	device: &BindingDevice<Headless>,
	name: &str,
	binding_index: u8,
	kind: ResourceKind,
) -> anyhow::Result<Arc<ResourceSignature<Headless>>> {
	Ok(device.create_signature(
		SignatureDesc::new(name)
			.binding_index(binding_index)
			.resource(ResourceDescriptor::new(
				"g_Resource",
				ShaderStages::COMPUTE,
				kind,
				Variability::Mutable,
			))
			.resource(ResourceDescriptor::new(
				"cbParams",
				ShaderStages::COMPUTE,
				ResourceKind::ConstantBuffer,
				Variability::Dynamic,
			)),
	)?)
}

#[test]
fn signature_order_does_not_matter() -> anyhow::Result<()> {
	let device = headless_device()?;
	let globals = signature(&device, "globals", 0, ResourceKind::TextureSrv)?;
	let locals = signature(&device, "locals", 3, ResourceKind::BufferUav)?;

	let forward = device.pipeline_layout(&[globals.clone(), locals.clone()])?;
	let backward = device.pipeline_layout(&[locals.clone(), globals.clone()])?;
	assert!(Arc::ptr_eq(&forward, &backward));
	assert_eq!(forward.first_parameter(0), 0);
	assert_eq!(forward.first_parameter(3), globals.layout().parameter_count());
	assert_eq!(forward.native().parameter_count, 4);
	assert_eq!(device.set_cache().stats(), SetCacheStats { hits: 1, misses: 1 });

	// a different signature at the same index is a different layout
	let other = signature(&device, "other", 3, ResourceKind::TextureUav)?;
	let third = device.pipeline_layout(&[globals, other])?;
	assert!(!Arc::ptr_eq(&forward, &third));
	assert_eq!(device.set_cache().len(), 2);
	assert_eq!(device.platform().layouts_created(), 2);
	Ok(())
}

#[test]
fn dropped_layouts_are_evicted() -> anyhow::Result<()> {
	let device = headless_device()?;
	let globals = signature(&device, "globals", 0, ResourceKind::TextureSrv)?;

	let layout = device.pipeline_layout(&[globals.clone()])?;
	assert_eq!(device.set_cache().len(), 1);
	drop(layout);
	assert!(device.set_cache().is_empty());

	// recreated on the next request
	let _layout = device.pipeline_layout(&[globals])?;
	assert_eq!(device.platform().layouts_created(), 2);
	assert_eq!(device.set_cache().stats(), SetCacheStats { hits: 0, misses: 2 });
	Ok(())
}

#[test]
fn empty_signatures_are_ignored() -> anyhow::Result<()> {
	let device = headless_device()?;
	let globals = signature(&device, "globals", 0, ResourceKind::TextureSrv)?;
	let empty = device.create_signature(SignatureDesc::new("empty").binding_index(5))?;

	let with_empty = device.pipeline_layout(&[globals.clone(), empty])?;
	let without = device.pipeline_layout(&[globals])?;
	assert!(Arc::ptr_eq(&with_empty, &without));
	Ok(())
}

#[test]
fn invalid_sets_are_rejected() -> anyhow::Result<()> {
	let device = headless_device()?;
	let a = signature(&device, "a", 1, ResourceKind::TextureSrv)?;
	let b = signature(&device, "b", 1, ResourceKind::TextureSrv)?;
	assert!(matches!(
		device.pipeline_layout(&[a, b]),
		Err(SetCacheError::Declaration(DeclarationError::ConflictingBindingIndex { index: 1, .. }))
	));
	assert!(device.set_cache().is_empty());
	assert_eq!(device.platform().layouts_created(), 0);
	Ok(())
}

#[test]
fn platform_errors_are_forwarded() -> anyhow::Result<()> {
	let device = BindingDevice::new(Headless::with_limits(DescriptorHeapSizes::new(1_000_000, 2048), 3), TEST_CONFIG)?;
	let a = signature(&device, "a", 0, ResourceKind::TextureSrv)?;
	let b = signature(&device, "b", 1, ResourceKind::TextureSrv)?;
	device.pipeline_layout(&[a.clone()])?;
	assert!(matches!(
		device.pipeline_layout(&[a, b]),
		Err(SetCacheError::Platform(HeadlessError::TooManyParameters { count: 4, max: 3 }))
	));
	Ok(())
}

#[test]
fn concurrent_creation_shares_one_layout() -> anyhow::Result<()> {
	// both threads miss the cache before either can insert its layout
	let barrier = Arc::new(Barrier::new(2));
	let device = BindingDevice::new(Headless::new().with_layout_barrier(barrier), TEST_CONFIG)?;
	let globals = signature(&device, "globals", 0, ResourceKind::TextureSrv)?;
	let locals = signature(&device, "locals", 1, ResourceKind::BufferUav)?;

	let (first, second) = thread::scope(|scope| {
		let first = scope.spawn(|| device.pipeline_layout(&[globals.clone(), locals.clone()]));
		let second = scope.spawn(|| device.pipeline_layout(&[locals.clone(), globals.clone()]));
		(first.join(), second.join())
	});
	let first = first.map_err(|_| anyhow::anyhow!("first thread panicked"))??;
	let second = second.map_err(|_| anyhow::anyhow!("second thread panicked"))??;

	assert!(Arc::ptr_eq(&first, &second));
	// the losing thread's native layout was created and then discarded
	assert_eq!(device.platform().layouts_created(), 2);
	assert_eq!(device.set_cache().stats(), SetCacheStats { hits: 1, misses: 1 });
	assert_eq!(device.set_cache().len(), 1);
	Ok(())
}
