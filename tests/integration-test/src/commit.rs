#![cfg(test)]

use crate::headless_device;
use crate::log_capture::capture_errors;
use binding_model_core::backing::CapacityError;
use binding_model_core::cache::BoundObject;
use binding_model_core::commit::{commit, commit_dynamic_inline_buffers, CommitError};
use binding_model_core::descriptor::{
	KindClass, ResourceDescriptor, ResourceKind, ShaderStages, SignatureDesc, Variability,
};
use binding_model_core::device::BindingDevice;
use binding_model_core::platform::headless::{Headless, HeadlessBuffer, HeadlessCommand, HeadlessContext};
use binding_model_core::platform::{BufferUsage, ResourceState, StateTransitionMode};
use binding_model_core::signature::{BindingInstance, ResourceSignature};
use std::sync::Arc;

fn draw_desc(name: &str, binding_index: u8) -> SignatureDesc {
	SignatureDesc::new(name)
		.binding_index(binding_index)
		.resource(ResourceDescriptor::new(
			"g_Texture",
			ShaderStages::FRAGMENT,
			ResourceKind::TextureSrv,
			Variability::Mutable,
		))
		.resource(ResourceDescriptor::new(
			"g_Output",
			ShaderStages::FRAGMENT,
			ResourceKind::TextureUav,
			Variability::Mutable,
		))
		.resource(ResourceDescriptor::new(
			"g_Dynamic",
			ShaderStages::FRAGMENT,
			ResourceKind::TextureSrv,
			Variability::Dynamic,
		))
		.resource(ResourceDescriptor::new(
			"cbFrame",
			ShaderStages::FRAGMENT,
			ResourceKind::ConstantBuffer,
			Variability::Dynamic,
		))
}

struct Draw {
	signature: Arc<ResourceSignature<Headless>>,
	instance: BindingInstance<Headless>,
	frame: Arc<HeadlessBuffer>,
}

fn bound_draw(device: &BindingDevice<Headless>, binding_index: u8) -> anyhow::Result<Draw> {
	let platform = device.platform();
	let signature = device.create_signature(draw_desc("draw", binding_index))?;
	let mut instance = signature.create_binding_instance(false)?;
	let frame = platform.create_buffer("frame", BufferUsage::Dynamic);
	instance.set_resource(0, 0, Some(BoundObject::TextureView(platform.create_texture_view("texture"))));
	instance.set_resource(1, 0, Some(BoundObject::TextureView(platform.create_texture_view_uav("output"))));
	instance.set_resource(2, 0, Some(BoundObject::TextureView(platform.create_texture_view("dynamic"))));
	instance.set_resource(3, 0, Some(BoundObject::Buffer(frame.clone())));
	Ok(Draw {
		signature,
		instance,
		frame,
	})
}

fn transitions(ctx: &HeadlessContext) -> Vec<&HeadlessCommand> {
	ctx.commands
		.iter()
		.filter(|c| matches!(c, HeadlessCommand::Transition { .. }))
		.collect()
}

fn inline_address(ctx: &HeadlessContext) -> Option<u64> {
	ctx.commands.iter().find_map(|c| match c {
		HeadlessCommand::BindInline { gpu_address, .. } => Some(*gpu_address),
		_ => None,
	})
}

#[test]
fn commit_records_transitions_and_bindings() -> anyhow::Result<()> {
	let device = headless_device()?;
	let draw = bound_draw(&device, 0)?;
	assert_eq!(draw.instance.cache().dynamic_inline_buffer_count(), 1);
	let persistent = draw
		.instance
		.cache()
		.table_heap_offset(0)
		.ok_or_else(|| anyhow::anyhow!("table 0 is not persistent"))?;
	let transient = device.heap(KindClass::View).persistent_capacity();

	let mut ring = device.create_transient_ring();
	let mut ctx = HeadlessContext::default();
	commit(&draw.instance, &mut ctx, &mut ring, StateTransitionMode::Transition)?;
	let transition = |object: &str, to| HeadlessCommand::Transition {
		object: object.to_string(),
		from: ResourceState::Undefined,
		to,
	};
	assert_eq!(
		ctx.commands,
		vec![
			transition("texture", ResourceState::ShaderResource),
			transition("output", ResourceState::UnorderedAccess),
			transition("dynamic", ResourceState::ShaderResource),
			transition("frame", ResourceState::ConstantBuffer),
			HeadlessCommand::BindHeaps {
				views: device.config().heap_size(KindClass::View),
				samplers: device.config().heap_size(KindClass::Sampler),
			},
			HeadlessCommand::BindTable {
				parameter: 0,
				class: KindClass::View,
				heap_offset: persistent,
			},
			HeadlessCommand::BindTable {
				parameter: 1,
				class: KindClass::View,
				heap_offset: transient,
			},
			HeadlessCommand::BindInline {
				parameter: 2,
				kind: ResourceKind::ConstantBuffer,
				gpu_address: draw.frame.gpu_address(),
			},
		]
	);

	// the dynamic table was copied into the transient range
	let dynamic = draw.instance.cache().table_descriptors(1);
	assert_eq!(
		device.platform().heap_contents(KindClass::View, transient..transient + 1),
		dynamic.to_vec()
	);

	// resources are in their states now, only the UAV needs a barrier
	let mut ctx = HeadlessContext::default();
	commit(&draw.instance, &mut ctx, &mut ring, StateTransitionMode::Transition)?;
	assert_eq!(
		transitions(&ctx),
		vec![&HeadlessCommand::Transition {
			object: "output".to_string(),
			from: ResourceState::UnorderedAccess,
			to: ResourceState::UnorderedAccess,
		}]
	);
	Ok(())
}

#[test]
fn dynamic_rebinding_is_visible_at_commit() -> anyhow::Result<()> {
	let device = headless_device()?;
	let platform = device.platform();
	let mut draw = bound_draw(&device, 0)?;
	let mut ring = device.create_transient_ring();

	let mut ctx = HeadlessContext::default();
	commit(&draw.instance, &mut ctx, &mut ring, StateTransitionMode::Transition)?;
	let first_address = inline_address(&ctx);

	let replacement = platform.create_texture_view("replacement");
	replacement.set_state(ResourceState::ShaderResource);
	assert!(draw.instance.set_resource(2, 0, Some(BoundObject::TextureView(replacement))));
	draw.frame.map_write_discard();

	let mut ctx = HeadlessContext::default();
	commit(&draw.instance, &mut ctx, &mut ring, StateTransitionMode::Transition)?;
	assert_ne!(inline_address(&ctx), first_address);
	assert_eq!(inline_address(&ctx), Some(draw.frame.gpu_address()));
	let offset = ctx
		.commands
		.iter()
		.find_map(|c| match c {
			HeadlessCommand::BindTable {
				parameter: 1,
				heap_offset,
				..
			} => Some(*heap_offset),
			_ => None,
		})
		.ok_or_else(|| anyhow::anyhow!("dynamic table was not bound"))?;
	assert_eq!(
		platform.heap_contents(KindClass::View, offset..offset + 1),
		draw.instance.cache().table_descriptors(1).to_vec()
	);

	// mutable variables refuse the replacement and keep what was committed before
	let (bound, log) = capture_errors(|| {
		draw.instance.set_resource(
			0,
			0,
			Some(BoundObject::TextureView(platform.create_texture_view("late"))),
		)
	});
	assert!(!bound);
	assert_eq!(log.count(), 1);
	assert!(matches!(
		draw.signature.bound_object(draw.instance.cache(), 0, 0),
		Some(object) if object.name() == "texture"
	));
	Ok(())
}

#[test]
fn only_dynamic_inline_buffers_are_rebound() -> anyhow::Result<()> {
	let device = headless_device()?;
	let draw = bound_draw(&device, 0)?;
	draw.frame.map_write_discard();
	draw.frame.map_write_discard();

	let mut ctx = HeadlessContext::default();
	commit_dynamic_inline_buffers(&draw.instance, &mut ctx);
	assert_eq!(
		ctx.commands,
		vec![HeadlessCommand::BindInline {
			parameter: 2,
			kind: ResourceKind::ConstantBuffer,
			gpu_address: draw.frame.gpu_address(),
		}]
	);

	// buffers with static contents keep the address resolved at bind time
	let signature = device.create_signature(draw_desc("static_frame", 0))?;
	let mut instance = signature.create_binding_instance(false)?;
	let constants = device.platform().create_buffer("constants", BufferUsage::Immutable);
	instance.set_resource(3, 0, Some(BoundObject::Buffer(constants)));
	assert_eq!(instance.cache().dynamic_inline_buffer_count(), 0);
	let mut ctx = HeadlessContext::default();
	commit_dynamic_inline_buffers(&instance, &mut ctx);
	assert!(ctx.commands.is_empty());
	Ok(())
}

#[test]
fn verify_mode_reports_instead_of_transitioning() -> anyhow::Result<()> {
	let device = headless_device()?;
	let draw = bound_draw(&device, 0)?;
	let mut ring = device.create_transient_ring();

	let mut ctx = HeadlessContext::default();
	let (result, log) = capture_errors(|| commit(&draw.instance, &mut ctx, &mut ring, StateTransitionMode::Verify));
	result?;
	assert!(transitions(&ctx).is_empty());
	assert_eq!(log.count(), 4);
	assert_eq!(draw.frame.state(), ResourceState::Undefined);
	Ok(())
}

#[test]
fn unbound_inline_buffer_is_skipped() -> anyhow::Result<()> {
	let device = headless_device()?;
	let signature = device.create_signature(draw_desc("unbound", 0))?;
	let instance = signature.create_binding_instance(false)?;
	let mut ring = device.create_transient_ring();

	let mut ctx = HeadlessContext::default();
	let (result, log) =
		capture_errors(|| commit(&instance, &mut ctx, &mut ring, StateTransitionMode::Transition));
	result?;
	assert_eq!(log.count(), 1);
	assert!(inline_address(&ctx).is_none());
	// the dynamic table is still bound, with null descriptors
	assert_eq!(
		ctx.commands
			.iter()
			.filter(|c| matches!(c, HeadlessCommand::BindTable { .. }))
			.count(),
		2
	);
	Ok(())
}

#[test]
fn parameters_are_offset_by_the_pipeline_layout() -> anyhow::Result<()> {
	let device = headless_device()?;
	let first = device.create_signature(draw_desc("first", 0))?;
	let second = bound_draw(&device, 1)?;
	let layout = device.pipeline_layout(&[first.clone(), second.signature.clone()])?;
	assert_eq!(layout.first_parameter(1), first.layout().parameter_count());

	let mut ring = device.create_transient_ring();
	let mut ctx = HeadlessContext::with_layout(layout.native());
	commit(&second.instance, &mut ctx, &mut ring, StateTransitionMode::Transition)?;
	let parameters: Vec<u32> = ctx
		.commands
		.iter()
		.filter_map(|c| match c {
			HeadlessCommand::BindTable { parameter, .. } | HeadlessCommand::BindInline { parameter, .. } => {
				Some(*parameter)
			}
			_ => None,
		})
		.collect();
	assert_eq!(parameters, vec![3, 4, 5]);
	Ok(())
}

#[test]
fn commit_fails_without_transient_space() -> anyhow::Result<()> {
	let device = headless_device()?;
	let chunk_size = device.heap(KindClass::View).chunk_size();
	let signature = device.create_signature(
		SignatureDesc::new("huge").resource(
			ResourceDescriptor::new(
				"g_Textures",
				ShaderStages::COMPUTE,
				ResourceKind::TextureSrv,
				Variability::Dynamic,
			)
			.with_array_size(chunk_size + 1),
		),
	)?;
	let mut instance = signature.create_binding_instance(false)?;
	let texture = device.platform().create_texture_view("texture");
	let initial = texture.state();
	instance.set_resource(0, 0, Some(BoundObject::TextureView(texture.clone())));

	let mut ring = device.create_transient_ring();
	let mut ctx = HeadlessContext::default();
	let result = commit(&instance, &mut ctx, &mut ring, StateTransitionMode::Transition);
	assert!(matches!(
		result,
		Err(CommitError::Capacity(CapacityError::TransientRequestTooLarge { .. }))
	));
	// the failed commit neither recorded barriers nor changed resource states
	assert!(ctx.commands.is_empty());
	assert_eq!(texture.state(), initial);
	Ok(())
}

#[test]
fn ring_of_another_device_is_rejected() -> anyhow::Result<()> {
	let device = headless_device()?;
	let other = headless_device()?;
	let draw = bound_draw(&device, 0)?;
	let mut ring = other.create_transient_ring();
	let mut ctx = HeadlessContext::default();
	assert!(matches!(
		commit(&draw.instance, &mut ctx, &mut ring, StateTransitionMode::Transition),
		Err(CommitError::ForeignRing { .. })
	));
	assert!(ctx.commands.is_empty());
	Ok(())
}
